use std::sync::Arc;

use crate::application::repos::HealthRepo;
use crate::cache::PageCache;

#[derive(Clone)]
pub struct AdminState {
    pub health: Arc<dyn HealthRepo>,
    pub cache: Arc<PageCache>,
}
