//! Process-wide table of pixel buffers waiting for deferred presentation.
//!
//! A presentation backend that cannot copy pixels inline receives a
//! `CallbackToken` id and later calls `service_update` from whatever
//! thread it renders on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use uuid::Uuid;

use crate::pixels::{PixelBuffer, PixelFrame};

fn registry() -> MutexGuard<'static, HashMap<Uuid, Weak<PixelBuffer>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<Uuid, Weak<PixelBuffer>>>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Registration of one pixel buffer; removed from the registry on drop.
#[derive(Debug)]
pub struct CallbackToken {
    id: Uuid,
}

impl CallbackToken {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for CallbackToken {
    fn drop(&mut self) {
        registry().remove(&self.id);
        log::trace!("Unregistered pixel buffer {}", self.id);
    }
}

/// Register `pixels` under the pipeline id `id`.
pub fn register(id: Uuid, pixels: &Arc<PixelBuffer>) -> CallbackToken {
    registry().insert(id, Arc::downgrade(pixels));
    log::trace!("Registered pixel buffer {id}");
    CallbackToken { id }
}

/// Run `f` once against the pixels registered under `id`, holding the read
/// lock for the duration. Returns `None` if the id is unknown or the
/// pipeline has been closed.
pub fn service_update<R>(id: Uuid, f: impl FnOnce(&PixelFrame) -> R) -> Option<R> {
    // Clone out of the table so the registry lock is not held while reading.
    let pixels = registry().get(&id).and_then(Weak::upgrade)?;
    Some(pixels.with_frame(f))
}

pub fn is_registered(id: Uuid) -> bool {
    registry().contains_key(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_buffer_is_serviced() {
        let pixels = Arc::new(PixelBuffer::new(4));
        pixels.write().data.copy_from_slice(&[9, 9, 9, 9]);
        let token = register(Uuid::new_v4(), &pixels);
        let seen = service_update(token.id(), |f| f.data.clone());
        assert_eq!(seen, Some(vec![9, 9, 9, 9]));
    }

    #[test]
    fn dropping_token_unregisters() {
        let pixels = Arc::new(PixelBuffer::new(4));
        let token = register(Uuid::new_v4(), &pixels);
        let id = token.id();
        assert!(is_registered(id));
        drop(token);
        assert!(!is_registered(id));
        assert!(service_update(id, |_| ()).is_none());
    }

    #[test]
    fn closed_pipeline_is_not_serviced() {
        let pixels = Arc::new(PixelBuffer::new(4));
        let token = register(Uuid::new_v4(), &pixels);
        drop(pixels);
        assert!(service_update(token.id(), |_| ()).is_none());
    }

    #[test]
    fn unknown_id_is_ignored() {
        assert!(service_update(Uuid::new_v4(), |_| ()).is_none());
    }
}
