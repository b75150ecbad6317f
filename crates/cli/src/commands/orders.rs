//! Order placement, completion and lookup commands

use anyhow::Result;
use colored::Colorize;

use crate::client::{
    ApiClient, CompleteOrderRequest, CompletionReceipt, DispatchReport, Order,
    PlaceOrderRequest, PlacementReceipt,
};
use crate::output::{
    color_error, color_status, format_items, format_minutes, format_optional_minutes,
    format_timestamp, print_info, print_json, print_success, print_warning, OutputFormat,
};

/// Place an order
pub async fn place_order(
    client: &ApiClient,
    request: PlaceOrderRequest,
    format: OutputFormat,
) -> Result<()> {
    let receipt: PlacementReceipt = client.post("api/v1/orders", &request).await?;

    match format {
        OutputFormat::Json => print_json(&receipt)?,
        OutputFormat::Table => {
            print_success(&format!("Order {} placed", receipt.order_id.cyan()));
            println!("Position:        {}", receipt.place_in_queue.to_string().bold());
            println!(
                "Estimated wait:  {}",
                format_minutes(receipt.estimated_wait_minutes)
            );
            println!("Placed at:       {}", format_timestamp(&receipt.placed_at));
            if receipt.model_version == "fallback" {
                print_warning("No trained model loaded, estimate is the fixed fallback");
            } else {
                println!("Model:           {}", receipt.model_version);
            }
            print_notifications(&receipt.notifications);
        }
    }

    Ok(())
}

/// Mark an order complete
pub async fn complete_order(
    client: &ApiClient,
    id: &str,
    completed_at: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/orders/{}/complete", id);
    let receipt: CompletionReceipt = client
        .post(&path, &CompleteOrderRequest { completed_at })
        .await?;

    match format {
        OutputFormat::Json => print_json(&receipt)?,
        OutputFormat::Table => {
            print_success(&format!("Order {} completed", receipt.order_id.cyan()));
            println!(
                "Estimated wait:  {}",
                format_minutes(receipt.estimated_wait_minutes)
            );
            println!(
                "Actual wait:     {}",
                format_minutes(receipt.actual_wait_minutes)
            );
            println!(
                "Error:           {}",
                color_error(Some(receipt.prediction_error_minutes))
            );
            if let Some(version) = &receipt.retrained_version {
                print_info(&format!("Model retrained, now serving {}", version.bold()));
            }
            print_notifications(&receipt.notifications);
        }
    }

    Ok(())
}

/// Show a single order
pub async fn show_order(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let order: Order = client.get(&format!("api/v1/orders/{}", id)).await?;

    match format {
        OutputFormat::Json => print_json(&order)?,
        OutputFormat::Table => {
            println!("{}", "Order".bold());
            println!("{}", "=".repeat(50));
            println!("ID:              {}", order.id.cyan());
            println!("Status:          {}", color_status(&order.status));
            println!("Items:           {}", format_items(&order.item_ids));
            println!("Placed at:       {}", format_timestamp(&order.placed_at));
            if let Some(completed_at) = &order.completed_at {
                println!("Completed at:    {}", format_timestamp(completed_at));
            }
            println!();
            println!("{}", "Queue".bold());
            println!("{}", "-".repeat(50));
            println!("Position:        {}", order.place_in_queue);
            println!("Items ahead:     {}", order.total_items_ahead_at_placement);
            println!(
                "Estimated wait:  {}",
                format_minutes(order.estimated_wait_minutes)
            );
            println!(
                "Actual wait:     {}",
                format_optional_minutes(order.actual_wait_minutes)
            );
            println!(
                "Error:           {}",
                color_error(order.prediction_error_minutes)
            );
        }
    }

    Ok(())
}

fn print_notifications(report: &DispatchReport) {
    if !report.sent.is_empty() {
        print_info(&format!("Notified via {}", report.sent.join(", ")));
    }
    for failure in &report.failed {
        print_warning(&format!(
            "{} notification failed: {}",
            failure.channel, failure.reason
        ));
    }
}
