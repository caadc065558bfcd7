//! Landmark session recording and replay.
//!
//! A recording is a JSON-lines file with one admitted frame per line:
//!
//! ```text
//! {"frame":0,"landmarks":[[0.51,0.22,-0.3],[0.52,0.20,-0.28], ...]}
//! {"frame":2,"landmarks":null}
//! ```
//!
//! `landmarks` is `null` when the model saw nobody. Recordings only hold raw
//! landmarks; nothing is learned from them.

use crate::core_modules::landmark::{Landmark, LandmarkFrame, Observation};
use crate::error::{PoseSwitchError, Result};
use crate::source::LandmarkSource;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;
use tracing::info;

/// One line of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Capture index of the frame in the original session.
    pub frame: u64,
    pub landmarks: Option<Vec<Landmark>>,
}

impl RecordedFrame {
    pub fn from_observation(frame: u64, observation: &Observation) -> Self {
        Self {
            frame,
            landmarks: observation.frame().map(|f| f.points().to_vec()),
        }
    }

    /// Converts back into what the source originally reported.
    pub fn to_observation(&self) -> Result<Observation> {
        match &self.landmarks {
            None => Ok(Observation::NoSubject),
            Some(points) => LandmarkFrame::from_slice(points).map(Observation::Subject),
        }
    }
}

/// Appends admitted observations to a JSON-lines file.
pub struct LandmarkRecorder {
    writer: BufWriter<File>,
    frames_written: u64,
}

impl LandmarkRecorder {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        info!(path = %path.display(), "Recording landmarks");
        Ok(Self {
            writer: BufWriter::new(file),
            frames_written: 0,
        })
    }

    pub fn record(&mut self, frame: u64, observation: &Observation) -> Result<()> {
        let line = RecordedFrame::from_observation(frame, observation);
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

/// Replays a recording as a landmark source.
pub struct ReplaySource {
    lines: Lines<BufReader<File>>,
    line_number: usize,
    current: Option<RecordedFrame>,
}

impl ReplaySource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PoseSwitchError::initialization(format!("cannot open recording {}: {e}", path.display()))
        })?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_number: 0,
            current: None,
        })
    }
}

impl LandmarkSource for ReplaySource {
    fn grab(&mut self) -> Result<bool> {
        self.current = None;
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(false);
            };
            self.line_number += 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let frame: RecordedFrame =
                serde_json::from_str(&line).map_err(|e| PoseSwitchError::Recording {
                    line: self.line_number,
                    message: e.to_string(),
                })?;
            self.current = Some(frame);
            return Ok(true);
        }
    }

    fn retrieve(&mut self) -> Result<Observation> {
        match &self.current {
            Some(frame) => frame.to_observation(),
            None => Err(PoseSwitchError::estimation("no frame grabbed")),
        }
    }
}
