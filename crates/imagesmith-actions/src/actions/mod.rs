//! Build action implementations
//!
//! # Available Actions
//!
//! - `pacstrap` - Bootstrap an Arch Linux rootfs with pacstrap

mod pacstrap;

pub use pacstrap::{
    PacstrapAction, BOOTSTRAP_PHASE, KEYRING_PHASE, MIRRORLIST_PATH, PACMAN_LOG_PATH,
};

use crate::engine::Pipeline;
use crate::traits::Action;
use imagesmith_recipe::{Recipe, Step};
use std::sync::Arc;

/// Build the action for one recipe step
pub fn action_for_step(step: &Step) -> Arc<dyn Action> {
    match step {
        Step::Pacstrap(step) => Arc::new(PacstrapAction::from_step(step)),
    }
}

/// Create a pipeline with one action per recipe step, in order
pub fn pipeline_from_recipe(recipe: &Recipe) -> Pipeline {
    let mut pipeline = Pipeline::new();
    for step in &recipe.actions {
        pipeline.push_arc(action_for_step(step));
    }
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_from_recipe() {
        let recipe = Recipe::from_yaml(
            "actions:\n  - action: pacstrap\n    config-file: a.conf\n  - action: pacstrap\n    config-file: b.conf\n",
        )
        .unwrap();

        let pipeline = pipeline_from_recipe(&recipe);
        assert_eq!(pipeline.action_names(), vec!["pacstrap", "pacstrap"]);
    }
}
