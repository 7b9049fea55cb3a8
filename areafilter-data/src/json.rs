//! Newline-delimited JSON entity streams.
//!
//! Each line holds one entity tagged by `type` (`point`, `way` or
//! `relation`). Blank lines are ignored when reading.

use std::io::{self, BufRead, Write};

use areafilter_core::{Entity, EntityKind, EntitySink};
use thiserror::Error;

use crate::SourceError;

/// Errors raised by [`JsonLinesSink`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// An entity could not be serialised.
    #[error("failed to encode {kind} {id}")]
    Encode {
        /// Kind of the rejected entity.
        kind: EntityKind,
        /// Id of the rejected entity.
        id: u64,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing to the underlying stream failed.
    #[error("failed to write entity stream")]
    Write(#[from] io::Error),
}

/// Sink writing one JSON document per entity.
///
/// # Examples
/// ```
/// use areafilter_core::{EntitySink, Point};
/// use areafilter_data::JsonLinesSink;
///
/// # fn main() -> Result<(), areafilter_data::SinkError> {
/// let mut sink = JsonLinesSink::new(Vec::new());
/// sink.process(Point::at(1, 0.0, 0.0).into())?;
/// sink.complete()?;
/// let text = String::from_utf8(sink.into_inner()).expect("utf-8 output");
/// assert!(text.starts_with(r#"{"type":"point","id":1"#));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of entities written so far.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EntitySink for JsonLinesSink<W> {
    type Error = SinkError;

    fn process(&mut self, entity: Entity) -> Result<(), Self::Error> {
        serde_json::to_writer(&mut self.writer, &entity).map_err(|source| SinkError::Encode {
            kind: entity.kind(),
            id: entity.id(),
            source,
        })?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn complete(&mut self) -> Result<(), Self::Error> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Feed every entity in a JSON lines stream to `sink`, then complete it.
///
/// Returns the number of entities forwarded.
///
/// # Examples
/// ```
/// use areafilter_core::Entity;
/// use areafilter_data::read_json_lines;
///
/// # fn main() -> Result<(), areafilter_data::SourceError> {
/// let input = "{\"type\":\"way\",\"id\":3,\"point_ids\":[1,2]}\n";
/// let mut entities: Vec<Entity> = Vec::new();
/// assert_eq!(read_json_lines(input.as_bytes(), &mut entities)?, 1);
/// assert_eq!(entities[0].id(), 3);
/// # Ok(())
/// # }
/// ```
pub fn read_json_lines<R, K>(reader: R, mut sink: K) -> Result<u64, SourceError>
where
    R: BufRead,
    K: EntitySink,
{
    let mut forwarded = 0;
    for (line_number, line) in (1_u64..).zip(reader.lines()) {
        let text = line.map_err(|source| SourceError::Read {
            line: line_number,
            source,
        })?;
        if text.trim().is_empty() {
            continue;
        }
        let entity: Entity = serde_json::from_str(&text).map_err(|source| SourceError::Parse {
            line: line_number,
            source,
        })?;
        sink.process(entity).map_err(SourceError::sink)?;
        forwarded += 1;
    }
    sink.complete().map_err(SourceError::sink)?;
    Ok(forwarded)
}
