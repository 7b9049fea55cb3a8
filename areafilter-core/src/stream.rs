//! Entity stream contract shared by pipeline stages.

use std::convert::Infallible;

use crate::Entity;

/// Downstream consumer of an entity stream.
///
/// Producers call [`process`](Self::process) once per entity and then
/// [`complete`](Self::complete) exactly once as the end-of-stream marker.
/// Kind ordering is not guaranteed by producers.
///
/// # Examples
///
/// ```rust
/// use areafilter_core::{Entity, EntitySink, Point};
///
/// let mut collected: Vec<Entity> = Vec::new();
/// collected.process(Point::at(1, 0.0, 0.0).into()).unwrap();
/// collected.complete().unwrap();
/// assert_eq!(collected.len(), 1);
/// ```
pub trait EntitySink {
    /// Failure raised by the sink.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Accept one entity.
    fn process(&mut self, entity: Entity) -> Result<(), Self::Error>;

    /// Signal that no more entities will arrive.
    fn complete(&mut self) -> Result<(), Self::Error>;
}

impl EntitySink for Vec<Entity> {
    type Error = Infallible;

    fn process(&mut self, entity: Entity) -> Result<(), Self::Error> {
        self.push(entity);
        Ok(())
    }

    fn complete(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<K> EntitySink for &mut K
where
    K: EntitySink + ?Sized,
{
    type Error = K::Error;

    fn process(&mut self, entity: Entity) -> Result<(), Self::Error> {
        (**self).process(entity)
    }

    fn complete(&mut self) -> Result<(), Self::Error> {
        (**self).complete()
    }
}
