use std::sync::Arc;

use crate::cast::caster::Caster;
use crate::cast::ControlClient;
use crate::config::Config;
use crate::stream::manager::Manager;

pub mod cast;
pub mod device;
pub mod health;
pub mod stream;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub manager: Manager,
    pub caster: Arc<Caster>,
    pub control: Arc<dyn ControlClient>,
}
