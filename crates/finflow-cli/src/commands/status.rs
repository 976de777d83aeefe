use anyhow::Result;

use crate::context::AppContext;

pub fn run(ctx: &AppContext) -> Result<()> {
    let status = ctx.profile_store().status()?;

    match &status.recorded {
        Some(record) => println!(
            "Active profile: {} (activated {})",
            record.profile,
            record.activated_at.to_rfc3339()
        ),
        None => println!("Active profile: none recorded"),
    }
    match status.detected {
        Some(profile) => println!("Target files match: {}", profile),
        None => println!("Target files match: no profile"),
    }
    if status.recorded.is_some() && !status.in_sync() {
        println!("Warning: target files have drifted from the recorded profile");
    }
    Ok(())
}
