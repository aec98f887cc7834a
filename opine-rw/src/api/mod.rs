//! HTTP API handlers for opine-rw

pub mod health;
pub mod wizard;

pub use health::health_routes;
pub use wizard::{
    next_step, open_wizard, previous_step, put_answer, start_wizard, submit_wizard, wizard_view,
};
