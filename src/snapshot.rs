use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::world::World;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writes a JSON world snapshot every `interval` ticks under
/// `<dir>/<scenario>/tick_NNNNNN.json`. Interval zero disables writing.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn maybe_write(
        &self,
        world: &World,
        scenario_name: &str,
    ) -> Result<Option<PathBuf>, SnapshotError> {
        if self.interval == 0 || world.tick() % self.interval != 0 {
            return Ok(None);
        }
        let dir = self.dir.join(scenario_name);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("tick_{:06}.json", world.tick()));
        let json = serde_json::to_string_pretty(&world.snapshot(scenario_name))?;
        fs::write(&path, json)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::GameClock;
    use crate::terrain;

    fn tiny_world() -> World {
        World::new(terrain::generate(8, 8, 1), GameClock::default())
    }

    #[test]
    fn interval_zero_writes_nothing() {
        let writer = SnapshotWriter::new("unused", 0);
        let world = tiny_world();
        assert!(writer.maybe_write(&world, "test").unwrap().is_none());
    }

    #[test]
    fn writes_on_interval_boundary() {
        let temp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(temp.path(), 2);
        let mut world = tiny_world();
        world.advance_time(1.0);
        assert!(writer.maybe_write(&world, "test").unwrap().is_none());
        world.advance_time(1.0);
        let path = writer.maybe_write(&world, "test").unwrap();
        assert!(path.is_some());
        let body = fs::read_to_string(path.unwrap()).unwrap();
        assert!(body.contains("\"tick\": 2"));
    }
}
