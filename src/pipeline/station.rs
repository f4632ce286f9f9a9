//! Station abstraction: a worker thread between two channels.

use crate::error::{AlignError, Result};
use crate::pipeline::error::{ErrorReporter, StationError};
use crossbeam_channel::{Receiver, Sender};
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A processing station in the batch pipeline.
///
/// Several runners may share one input receiver; each item is then handled
/// by whichever station takes it first.
pub trait Station: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Processes a single input item.
    ///
    /// - `Ok(Some(output))` forwards the output
    /// - `Ok(None)` drops the item
    /// - `Err(StationError)` reports it; `Fatal` also stops the station
    fn process(&mut self, input: Self::Input) -> std::result::Result<Option<Self::Output>, StationError>;

    fn name(&self) -> &'static str;

    /// Called once when the input channel closes or the station stops.
    fn shutdown(&mut self) {}
}

/// Runs a station in a dedicated, named thread.
pub struct StationRunner<S: Station> {
    handle: Option<JoinHandle<usize>>,
    station_name: &'static str,
    _phantom: PhantomData<S>,
}

impl<S: Station> StationRunner<S> {
    /// Spawns `station`, reading from `input_rx` and writing to `output_tx`.
    ///
    /// `worker` distinguishes runners of the same station in thread names.
    pub fn spawn(
        mut station: S,
        worker: usize,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self> {
        let station_name = station.name();
        let handle = thread::Builder::new()
            .name(format!("{station_name}-{worker}"))
            .spawn(move || Self::run_station(&mut station, input_rx, output_tx, error_reporter))?;

        Ok(Self {
            handle: Some(handle),
            station_name,
            _phantom: PhantomData,
        })
    }

    /// Processing loop. Returns the number of items forwarded.
    fn run_station(
        station: &mut S,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> usize {
        let station_name = station.name();
        let mut forwarded = 0;

        while let Ok(input) = input_rx.recv() {
            match station.process(input) {
                Ok(Some(output)) => {
                    if output_tx.send(output).is_err() {
                        break;
                    }
                    forwarded += 1;
                }
                Ok(None) => {}
                Err(error @ StationError::Recoverable(_)) => {
                    error_reporter.report(station_name, &error);
                }
                Err(error @ StationError::Fatal(_)) => {
                    error_reporter.report(station_name, &error);
                    break;
                }
            }
        }

        station.shutdown();
        forwarded
    }

    /// Waits for the station thread. Returns the number of items forwarded.
    pub fn join(mut self) -> Result<usize> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| AlignError::Other(format!("station '{}' thread panicked", self.station_name))),
            None => Ok(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.station_name
    }
}
