//! Check-upgrade command - run the version compatibility gate

use preflight_core::check_upgrade;

use crate::display::print_decision;
use crate::error::{CliError, Result};

pub fn run(installed: &str, target: &str, json: bool) -> Result<()> {
    let decision = check_upgrade(installed, target)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        if !decision.allowed {
            std::process::exit(crate::exit_codes::UPGRADE_DENIED);
        }
        return Ok(());
    }

    print_decision(&decision);
    decision.into_result().map(|_| ()).map_err(CliError::from)
}
