//! Debug and troubleshooting CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{
    ActiveOrder, ApiClient, DebugDump, PendingOrder, RetrainResponse, TrainedList,
};
use crate::output::{
    color_error, color_status, format_items, format_minutes, format_optional_minutes,
    format_timestamp, print_info, print_json, print_rows, print_success, print_warning, short_id,
    OutputFormat,
};

/// Row for the active queue table
#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "#")]
    position: u32,
    #[tabled(rename = "Order")]
    order_id: String,
    #[tabled(rename = "Items")]
    items: String,
    #[tabled(rename = "Placed")]
    placed_at: String,
    #[tabled(rename = "Placed At #")]
    place_in_queue: u32,
    #[tabled(rename = "Estimate")]
    estimate: String,
    #[tabled(rename = "Contact")]
    contact: String,
}

/// Row for the pending-training table
#[derive(Tabled)]
struct PendingRow {
    #[tabled(rename = "Order")]
    order_id: String,
    #[tabled(rename = "Items")]
    items: String,
    #[tabled(rename = "Estimate")]
    estimate: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Error")]
    error: String,
}

/// Force a retraining cycle
pub async fn retrain(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: RetrainResponse = client
        .post("api/v1/debug/retrain", &serde_json::json!({}))
        .await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => match &response.report {
            Some(report) => {
                print_success(&format!("Model {} trained", report.version.bold()));
                println!("Samples:  {}", report.samples);
                println!("MAE:      {}", format_minutes(report.metrics.mae));
                println!("RMSE:     {}", format_minutes(report.metrics.rmse));
                if !report.persisted {
                    print_warning("Model was not persisted and will not survive a restart");
                }
            }
            None => print_info("No completed orders waiting for training"),
        },
    }

    Ok(())
}

/// Show the active queue
pub async fn show_queue(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let queue: Vec<ActiveOrder> = client.get("api/v1/debug/queue").await?;

    match format {
        OutputFormat::Json => print_json(&queue)?,
        OutputFormat::Table => {
            let total = queue.len();
            let rows: Vec<QueueRow> = queue
                .into_iter()
                .map(|o| QueueRow {
                    position: o.position,
                    order_id: short_id(&o.order_id),
                    items: format_items(&o.item_ids),
                    placed_at: format_timestamp(&o.placed_at),
                    place_in_queue: o.place_in_queue,
                    estimate: format_minutes(o.estimated_wait_minutes),
                    contact: o.phone_number.or(o.email).unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            print_rows(rows, "Queue is empty");
            if total > 0 {
                println!("\nTotal: {} active orders", total);
            }
        }
    }

    Ok(())
}

/// Show completed orders waiting for the next retrain
pub async fn show_pending(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let pending: Vec<PendingOrder> = client.get("api/v1/debug/pending-training").await?;

    match format {
        OutputFormat::Json => print_json(&pending)?,
        OutputFormat::Table => {
            let rows: Vec<PendingRow> = pending
                .iter()
                .map(|o| PendingRow {
                    order_id: short_id(&o.order_id),
                    items: format_items(&o.item_ids),
                    estimate: format_minutes(o.estimated_wait_minutes),
                    actual: format_optional_minutes(o.actual_wait_minutes),
                    error: color_error(o.prediction_error_minutes),
                })
                .collect();
            print_rows(rows, "No orders pending training");
        }
    }

    Ok(())
}

/// Show ids already consumed by a retrain
pub async fn show_trained(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let trained: TrainedList = client.get("api/v1/debug/trained").await?;

    match format {
        OutputFormat::Json => print_json(&trained)?,
        OutputFormat::Table => {
            if trained.order_ids.is_empty() {
                print_warning("No orders trained yet");
                return Ok(());
            }
            for id in &trained.order_ids {
                println!("{}", id);
            }
            println!("\nTotal: {} trained orders", trained.total);
        }
    }

    Ok(())
}

/// Dump every partition plus predictor state
pub async fn dump(client: &ApiClient, output: Option<String>, format: OutputFormat) -> Result<()> {
    let dump: DebugDump = client.get("api/v1/debug/dump").await?;

    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&dump)?)?;
        print_success(&format!("Dump written to {}", path));
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_json(&dump)?,
        OutputFormat::Table => {
            let stats = &dump.predictor;
            println!("{}", "Queue Dump".bold());
            println!("{}", "=".repeat(50));
            println!("Generated:         {}", format_timestamp(&dump.generated_at));
            println!("Active:            {}", dump.store.active.len());
            println!("Pending training:  {}", dump.store.pending_training.len());
            println!("Trained:           {}", dump.store.trained.len());
            println!();
            println!("{}", "Predictor".bold());
            println!("{}", "-".repeat(50));
            println!("State:             {}", color_status(&stats.state));
            match &stats.model {
                Some(model) => {
                    println!("Model:             {} ({})", model.version, model.source);
                    println!("Trained on:        {} samples", model.samples);
                    println!("MAE:               {}", format_minutes(model.metrics.mae));
                }
                None => print_warning("No model loaded"),
            }
            println!(
                "Buffer:            {}/{}",
                stats.buffered_samples, stats.retrain_threshold
            );
            println!(
                "Predictions:       {} ({} fallback)",
                stats.total_predictions, stats.fallback_predictions
            );
            println!("Retrains:          {}", stats.retrain_count);
            println!();
            print_info("Use --format json to see every order");
        }
    }

    Ok(())
}
