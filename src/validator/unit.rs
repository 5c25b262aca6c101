use super::protocol::{ValidatorCommand, ValidatorEvent};
use crate::plugin::{Loader, check_contract};
use crate::unit::{UnitContext, UnitExit};

use std::sync::Arc;

/// Entry of a validation unit: answers the first `validate` command, then exits.
pub async fn run_validation(
    mut ctx: UnitContext<ValidatorCommand, ValidatorEvent>,
    loader: Arc<dyn Loader>,
) -> UnitExit {
    let Some(ValidatorCommand::Validate { module_path }) = ctx.recv().await else {
        tracing::debug!("Validator {} closed before receiving a command", ctx.label());
        return UnitExit::Clean;
    };

    tracing::debug!("Validating {}", module_path.display());

    let event = match loader.load(&module_path) {
        Ok(module) => match check_contract(module) {
            Ok(_) => ValidatorEvent::ValidationSuccess,
            Err(violation) => ValidatorEvent::ValidationFailed {
                message: violation.to_string(),
            },
        },
        Err(e) => ValidatorEvent::ValidationError {
            error: e.to_string(),
        },
    };

    ctx.emit(event);
    UnitExit::Clean
}
