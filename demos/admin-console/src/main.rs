use std::sync::Arc;
use std::time::Duration;

use hostdesk::prelude::*;
use serde_json::{Value, json};
use tracing::info;

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

const OPS: (&str, &str) = ("ops@hostdesk.app", "correct-horse");

fn seeded_backend() -> MemoryBackend {
    MemoryBackend::new()
        .with_account(OPS.0, OPS.1)
        .with_admin(OPS.0)
        .with_rows(
            "customers",
            vec![
                json!({"id": 1, "name": "Acme Hosting", "plan": "dedicated", "status": "active"}),
                json!({"id": 2, "name": "Bolt Labs", "plan": "vps", "status": "suspended"}),
                json!({"id": 3, "name": "Cirrus Media", "plan": "shared", "status": "active"}),
            ],
        )
        .with_rows(
            "invoices",
            vec![
                json!({"id": 101, "customer_id": 1, "status": "paid", "total_cents": 49900}),
                json!({"id": 102, "customer_id": 2, "status": "overdue", "total_cents": 1999}),
                json!({"id": 103, "customer_id": 3, "status": "overdue", "total_cents": 599}),
            ],
        )
        .with_latency(Latency {
            get_session: Duration::from_millis(300),
            query: Duration::from_millis(50),
            ..Latency::default()
        })
}

// ---------------------------------------------------------------------------
// Screen helpers
// ---------------------------------------------------------------------------

/// Sum of `total_cents` over `rows`, ignoring rows without one.
fn total_cents(rows: &[Value]) -> i64 {
    rows.iter().filter_map(|r| r["total_cents"].as_i64()).sum()
}

fn format_cents(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

fn describe<T>(view: &View<T>) -> String {
    match view {
        View::Loading => "loading".to_string(),
        View::Redirect(r) => format!("redirect to {} (return to {})", r.to, r.return_to),
        View::Protected(_) => "protected content".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

/// Summary of one walkthrough, returned so tests can check it.
#[derive(Debug)]
struct Report {
    denied_before_sign_in: bool,
    active_customers: usize,
    overdue_cents: i64,
}

async fn run<B: Backend, S: CredentialStore>(console: &Console<B, S>) -> Result<Report, HostdeskError> {
    let guard = console.guard("/admin/invoices");
    info!(view = %describe(&guard.render(|| ())), "initial render");

    let state = guard.settled().await;
    info!(state = %state, "guard settled");
    let denied_before_sign_in = state.is_denied();

    let identity = console.sign_in(OPS.0, OPS.1).await?;
    info!(email = %identity.email, admin = identity.is_administrator, "signed in");
    guard.wait_for(GuardState::is_authorized).await;

    let customers = console.table("customers", QueryFilter::new().eq("status", "active").order("name", true))?;
    let invoices = console.table("invoices", QueryFilter::new().eq("status", "overdue"))?;

    let customers = customers.settled().await.data.unwrap_or_default();
    let invoices = invoices.settled().await.data.unwrap_or_default();
    for row in &customers {
        info!(name = %row["name"], plan = %row["plan"], "active customer");
    }
    let overdue_cents = total_cents(&invoices);
    info!(count = invoices.len(), total = %format_cents(overdue_cents), "overdue invoices");

    console.sign_out().await?;
    let state = guard.wait_for(GuardState::is_denied).await;
    info!(state = %state, "signed out");

    Ok(Report {
        denied_before_sign_in,
        active_customers: customers.len(),
        overdue_cents,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    hostdesk::init_tracing();

    let console = ConsoleBuilder::new()
        .config(ConsoleConfig::from_env())
        .build(Arc::new(seeded_backend()), Arc::new(MemoryStore::new()));

    let report = run(&console).await?;
    info!(
        denied_before_sign_in = report.denied_before_sign_in,
        active_customers = report.active_customers,
        overdue = %format_cents(report.overdue_cents),
        "walkthrough finished"
    );

    console.shutdown().await;
    Ok(())
}
