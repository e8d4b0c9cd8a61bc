use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use csv::Writer;
use thiserror::Error;

use crate::{Integrable, model::ModelError};

/// Error returned by observers. Same shape as model errors so any error type can be boxed in.
pub type ObserverError = ModelError;

#[derive(Debug, Error)]
pub enum SavingErrors {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("state has {found} components, the csv header has {expected}")]
    Width { expected: usize, found: usize },
}

/// Receives every accepted step of a solve as `(t, y, dt)`, where `dt` is the step that
/// led to `t`. The initial condition is reported with `dt = 0` only when
/// [`SolveOptions::observe_initial`](crate::SolveOptions::observe_initial) is set.
pub trait Observer<State> {
    fn observe(&mut self, t: f64, y: &State, dt: f64) -> Result<(), ObserverError>;
}

impl<State, F> Observer<State> for F
where
    F: FnMut(f64, &State, f64),
{
    fn observe(&mut self, t: f64, y: &State, dt: f64) -> Result<(), ObserverError> {
        self(t, y, dt);
        Ok(())
    }
}

/// A growable in-memory record of the accepted steps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryResult<State> {
    /// Recorded times.
    pub t: Vec<f64>,
    /// Recorded states.
    pub y: Vec<State>,
    /// Step sizes that led to each record.
    pub dt: Vec<f64>,
}

impl<State> MemoryResult<State> {
    /// Constructs an empty record with room for `n` entries.
    pub fn new(n: usize) -> Self {
        Self {
            t: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            dt: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Last recorded `(t, y)`.
    pub fn last(&self) -> Option<(f64, &State)> {
        self.t.last().copied().zip(self.y.last())
    }

    // drops spare capacity once the solve is over
    pub fn shrink_to_fit(&mut self) {
        self.t.shrink_to_fit();
        self.y.shrink_to_fit();
        self.dt.shrink_to_fit();
    }
}

impl<State: Clone> Observer<State> for MemoryResult<State> {
    fn observe(&mut self, t: f64, y: &State, dt: f64) -> Result<(), ObserverError> {
        self.t.push(t);
        self.y.push(y.clone());
        self.dt.push(dt);
        Ok(())
    }
}

/// Writes `t,dt,y[0],...,y[n-1]` rows with the csv crate.
///
/// The header is written with the first row, when the state width is known.
pub struct CsvObserver<W: Write> {
    writer: Writer<W>,
    width: Option<usize>,
    record: Vec<String>,
}

impl CsvObserver<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SavingErrors> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> CsvObserver<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: Writer::from_writer(writer),
            width: None,
            record: Vec::new(),
        }
    }

    pub fn write<State: Integrable>(
        &mut self,
        t: f64,
        y: &State,
        dt: f64,
    ) -> Result<(), SavingErrors> {
        let components = y.components();
        match self.width {
            None => {
                let mut header = vec!["t".to_string(), "dt".to_string()];
                header.extend((0..components.len()).map(|i| format!("y[{i}]")));
                self.writer.write_record(&header)?;
                self.width = Some(components.len());
            }
            Some(expected) if expected != components.len() => {
                return Err(SavingErrors::Width {
                    expected,
                    found: components.len(),
                });
            }
            Some(_) => {}
        }

        self.record.clear();
        self.record.push(t.to_string());
        self.record.push(dt.to_string());
        self.record
            .extend(components.iter().map(|value| value.to_string()));
        self.writer.write_record(&self.record)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), SavingErrors> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    pub fn finish(self) -> Result<W, SavingErrors> {
        self.writer
            .into_inner()
            .map_err(|e| SavingErrors::Io(e.into_error()))
    }
}

impl<W: Write, State: Integrable> Observer<State> for CsvObserver<W> {
    fn observe(&mut self, t: f64, y: &State, dt: f64) -> Result<(), ObserverError> {
        Ok(self.write(t, y, dt)?)
    }
}
