//! Order processing connected by a short-circuit expression.
//!
//! Demonstrates:
//! - `||` fallbacks (reserve from stock, otherwise backorder)
//! - `if`/`elsif`/`else` chains picking a payment path
//! - Steps that never run because their outcome cannot change the decision

use async_trait::async_trait;
use musubi::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
struct Order {
    id: String,
    quantity: u32,
    invoice_customer: bool,
    card_on_file: bool,
}

#[derive(Debug)]
struct ValidateOrder;

#[async_trait]
impl Step for ValidateOrder {
    async fn call(&self, ctx: &mut Context) -> Result<Outcome, WorkflowError> {
        let order = ctx
            .get::<Order>("order")
            .ok_or_else(|| WorkflowError::StepError {
                step_name: StepName::new("validate"),
                details: "no order in context".to_string(),
            })?;

        if order.quantity == 0 {
            return Ok(Outcome::failure_with_reason(Data::new(), "empty order"));
        }
        println!("Validated order {}", order.id);
        Ok(Outcome::success(Data::new()))
    }
}

#[derive(Debug)]
struct ReserveStock {
    available: u32,
}

#[async_trait]
impl Step for ReserveStock {
    async fn call(&self, ctx: &mut Context) -> Result<Outcome, WorkflowError> {
        let wanted = ctx.get::<Order>("order").map_or(0, |order| order.quantity);
        let payload = json!({"requested": wanted, "available": self.available});
        let serde_json::Value::Object(data) = payload else {
            return Ok(Outcome::error("malformed stock payload"));
        };

        if wanted <= self.available {
            println!("Reserved {wanted} item(s) from stock");
            Ok(Outcome::success(data))
        } else {
            Ok(Outcome::failure_with_reason(data, "insufficient stock"))
        }
    }
}

#[derive(Debug)]
struct Backorder;

#[async_trait]
impl Step for Backorder {
    async fn call(&self, ctx: &mut Context) -> Result<Outcome, WorkflowError> {
        ctx.insert("backordered", true);
        println!("Placed backorder with supplier");
        Ok(Outcome::success(Data::new()))
    }
}

/// Succeeds when the order matches a payment preference.
#[derive(Debug)]
enum Prefers {
    Invoice,
    Card,
}

#[async_trait]
impl Step for Prefers {
    async fn call(&self, ctx: &mut Context) -> Result<Outcome, WorkflowError> {
        let Some(order) = ctx.get::<Order>("order") else {
            return Ok(Outcome::error("no order in context"));
        };
        let matches = match self {
            Prefers::Invoice => order.invoice_customer,
            Prefers::Card => order.card_on_file,
        };
        if matches {
            Ok(Outcome::success(Data::new()))
        } else {
            Ok(Outcome::failure(Data::new()))
        }
    }
}

#[derive(Debug)]
struct Charge {
    method: &'static str,
}

#[async_trait]
impl Step for Charge {
    async fn call(&self, ctx: &mut Context) -> Result<Outcome, WorkflowError> {
        println!("Charging via {}", self.method);
        ctx.insert("payment_method", self.method.to_string());
        Ok(Outcome::success(Data::new()))
    }
}

fn workflow(available: u32) -> Result<Workflow, WorkflowError> {
    Workflow::builder()
        .add_step("validate", ValidateOrder)
        .add_step("reserve", ReserveStock { available })
        .add_step("backorder", Backorder)
        .add_step("invoice_customer", Prefers::Invoice)
        .add_step("card_on_file", Prefers::Card)
        .add_step("send_invoice", Charge { method: "invoice" })
        .add_step("charge_card", Charge { method: "card" })
        .add_step("request_payment", Charge { method: "payment link" })
        .connect(|s| {
            let payment = Expression::complex_if(
                Conditional::new(s.scalar("invoice_customer")?, s.scalar("send_invoice")?),
                vec![Conditional::new(
                    s.scalar("card_on_file")?,
                    s.scalar("charge_card")?,
                )],
                Some(s.scalar("request_payment")?),
            );
            let fulfilled = Expression::group(Expression::or(
                s.scalar("reserve")?,
                s.scalar("backorder")?,
            ));

            Ok(Expression::if_then(
                s.scalar("validate")?,
                Expression::if_then(fulfilled, payment),
            ))
        })
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let workflow = workflow(5)?;
    println!("Connection: {}", workflow.inspect());

    let orders = [
        Order {
            id: "A-100".to_string(),
            quantity: 2,
            invoice_customer: false,
            card_on_file: true,
        },
        Order {
            id: "A-101".to_string(),
            quantity: 9,
            invoice_customer: true,
            card_on_file: false,
        },
        Order {
            id: "A-102".to_string(),
            quantity: 0,
            invoice_customer: false,
            card_on_file: false,
        },
    ];

    for order in orders {
        let id = order.id.clone();
        let mut ctx = Context::new();
        ctx.insert("order", order);

        let execution = workflow.execute(ctx).await?;
        let ran: Vec<String> = execution
            .organizer()
            .context()
            .await
            .journal()
            .iter()
            .map(|entry| entry.name.to_string())
            .collect();

        println!(
            "Order {id}: {} (ran: {})",
            execution.outcome().status(),
            ran.join(", ")
        );
    }

    Ok(())
}
