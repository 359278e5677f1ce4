use thiserror::Error;

use crate::Param;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("parameter {param} could not be resolved at height {height}: {reason}")]
    ParameterLookupFailure {
        param: Param,
        height: u32,
        reason: String,
    },
}
