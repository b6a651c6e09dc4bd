//! CLI handlers for `mealplan plan` subcommands.
//!
//! Implements:
//! - `mealplan plan save <file>`    -- create or update a plan from a JSON file
//! - `mealplan plan show [plan-id]` -- show one plan or list all plans
//! - `mealplan plan delete <plan-id>` -- delete a plan

use anyhow::{Context, Result};
use sqlx::PgPool;

use mealplan_core::catalog::PgCatalog;
use mealplan_core::plan::{
    MealPlanView, SavePlanRequest, delete_meal_plan, get_meal_plan, list_meal_plans,
    save_meal_plan,
};

use crate::PlanCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, pool: &PgPool) -> Result<()> {
    match command {
        PlanCommands::Save { file } => cmd_save(pool, &file).await,
        PlanCommands::Show { plan_id } => match plan_id {
            Some(id) => cmd_show_one(pool, id).await,
            None => cmd_show_all(pool).await,
        },
        PlanCommands::Delete { plan_id } => cmd_delete(pool, plan_id).await,
    }
}

// -----------------------------------------------------------------------
// mealplan plan save <file>
// -----------------------------------------------------------------------

/// Parse a save request from JSON text.
pub fn parse_save_request(content: &str) -> Result<SavePlanRequest> {
    serde_json::from_str(content).context("invalid meal plan JSON")
}

/// Read a request from disk, save it, and print the resulting identifier.
async fn cmd_save(pool: &PgPool, file_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read plan file: {file_path}"))?;
    let request = parse_save_request(&content)
        .with_context(|| format!("failed to parse plan file: {file_path}"))?;

    let outcome = save_meal_plan(pool, &request).await?;

    let action = match (outcome.created, outcome.recycled) {
        (true, true) => "created (recycled id)",
        (true, false) => "created",
        (false, _) => "updated",
    };
    println!("Meal plan {action}.");
    println!();
    println!("  Plan ID:  {}", outcome.meal_plan_id);
    println!("  Meals:    {}", request.meals.len());

    Ok(())
}

// -----------------------------------------------------------------------
// mealplan plan show (list all)
// -----------------------------------------------------------------------

/// List all plans with summary info.
async fn cmd_show_all(pool: &PgPool) -> Result<()> {
    let catalog = PgCatalog::new(pool.clone());
    let plans = list_meal_plans(pool, &catalog).await?;

    if plans.is_empty() {
        println!("No meal plans found. Use `mealplan plan save <file>` to create one.");
        return Ok(());
    }

    println!(
        "{:>6}  {:<10}  {:<10}  {:>6}  {:>8}  {:>12}  {:>5}  UPDATED",
        "ID", "START", "END", "PEOPLE", "CHILDREN", "TOTAL COST", "MEALS",
    );
    for entry in &plans {
        let plan = &entry.plan;
        println!(
            "{:>6}  {:<10}  {:<10}  {:>6}  {:>8}  {:>12.2}  {:>5}  {}",
            plan.id,
            plan.range_start,
            plan.range_end,
            plan.people_count,
            plan.children_count,
            plan.total_cost,
            entry.details.len(),
            plan.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// mealplan plan show <plan-id>
// -----------------------------------------------------------------------

/// Show one plan with each meal resolved against the food catalog.
async fn cmd_show_one(pool: &PgPool, plan_id: i32) -> Result<()> {
    let catalog = PgCatalog::new(pool.clone());
    let view = get_meal_plan(pool, &catalog, plan_id).await?;
    print!("{}", render_plan(&view));
    Ok(())
}

/// Render a plan view as plain text.
pub fn render_plan(view: &MealPlanView) -> String {
    let plan = &view.plan;
    let mut out = String::new();
    out.push_str(&format!("Meal plan {}\n", plan.id));
    out.push_str(&format!(
        "  Range:        {} .. {}\n",
        plan.range_start, plan.range_end
    ));
    out.push_str(&format!(
        "  People:       {} ({} children)\n",
        plan.people_count, plan.children_count
    ));
    out.push_str(&format!("  Total cost:   {:.2}\n", plan.total_cost));
    out.push_str(&format!(
        "  Updated:      {}\n",
        plan.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("  Meals:        {}\n", view.details.len()));

    if view.details.is_empty() {
        return out;
    }

    out.push('\n');
    for line in &view.details {
        let name = line.food_name.as_deref().unwrap_or("(unknown food)");
        out.push_str(&format!(
            "  {:<9}  {:<9}  {:>3} x {:<30}  {:>12.2}  {:>8.1} kcal\n",
            line.meal.day_of_week.to_string(),
            line.meal.meal_time.to_string(),
            line.meal.quantity,
            format!("{name} [#{}]", line.meal.food_id),
            line.line_price,
            line.line_calories,
        ));
    }
    out.push('\n');
    out.push_str(&format!(
        "  Catalog total: {:.2}, {:.1} kcal\n",
        view.total_price, view.total_calories
    ));
    out
}

// -----------------------------------------------------------------------
// mealplan plan delete <plan-id>
// -----------------------------------------------------------------------

async fn cmd_delete(pool: &PgPool, plan_id: i32) -> Result<()> {
    delete_meal_plan(pool, plan_id).await?;
    println!("Meal plan {plan_id} deleted.");
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
