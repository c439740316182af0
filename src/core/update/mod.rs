mod model;
mod updater;

pub use model::{UpdateInfo, UpdateState};
pub use updater::SelfUpdater;
