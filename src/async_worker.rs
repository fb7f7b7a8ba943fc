use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;

use tracing::debug;
use tt_core::completion::CompletionClient;
use tt_core::field::FieldId;
use tt_session::{CorrectionRequest, CorrectionResult, PredictionRequest, PredictionResult};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

pub(crate) enum WorkResult {
    Correction(CorrectionResult),
    Prediction(PredictionResult),
}

// ---------------------------------------------------------------------------
// Generation board
// ---------------------------------------------------------------------------

/// Latest known generation per field, shared with the worker threads so
/// they can drop work the user has already typed past.
#[derive(Default)]
struct GenerationBoard {
    latest: Mutex<HashMap<FieldId, u64>>,
}

impl GenerationBoard {
    fn publish(&self, field: FieldId, generation: u64) {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field, generation);
    }

    fn forget(&self, field: FieldId) {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&field);
    }

    fn is_current(&self, field: FieldId, generation: u64) -> bool {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest.get(&field).map_or(true, |&g| g == generation)
    }
}

// ---------------------------------------------------------------------------
// AsyncWorker
// ---------------------------------------------------------------------------

/// Runs blocking model calls off the host's thread.
///
/// Corrections and predictions each get a dedicated thread so a slow
/// correction never delays ghost text. Results are picked up by `try_recv`
/// from the host's `poll`.
pub(crate) struct AsyncWorker {
    correction_tx: mpsc::Sender<CorrectionRequest>,
    prediction_tx: mpsc::Sender<PredictionRequest>,
    result_rx: Mutex<mpsc::Receiver<WorkResult>>,
    board: Arc<GenerationBoard>,
    outstanding: Arc<AtomicUsize>,
}

impl AsyncWorker {
    pub fn new(client: Arc<CompletionClient>) -> io::Result<Self> {
        let board = Arc::new(GenerationBoard::default());
        let outstanding = Arc::new(AtomicUsize::new(0));
        let (result_tx, result_rx) = mpsc::channel::<WorkResult>();

        // Correction worker
        let (correction_tx, correction_rx) = mpsc::channel::<CorrectionRequest>();
        {
            let client = Arc::clone(&client);
            let board = Arc::clone(&board);
            let outstanding = Arc::clone(&outstanding);
            let tx = result_tx.clone();
            thread::Builder::new()
                .name("turbotype-correct".into())
                .spawn(move || correction_worker(correction_rx, tx, board, outstanding, client))?;
        }

        // Prediction worker
        let (prediction_tx, prediction_rx) = mpsc::channel::<PredictionRequest>();
        {
            let board = Arc::clone(&board);
            let outstanding = Arc::clone(&outstanding);
            thread::Builder::new()
                .name("turbotype-predict".into())
                .spawn(move || {
                    prediction_worker(prediction_rx, result_tx, board, outstanding, client)
                })?;
        }

        Ok(Self {
            correction_tx,
            prediction_tx,
            result_rx: Mutex::new(result_rx),
            board,
            outstanding,
        })
    }

    /// Record the field's current generation; queued work older than this
    /// is skipped.
    pub fn publish(&self, field: FieldId, generation: u64) {
        self.board.publish(field, generation);
    }

    pub fn forget(&self, field: FieldId) {
        self.board.forget(field);
    }

    pub fn submit_correction(&self, request: CorrectionRequest) {
        self.board.publish(request.field, request.generation);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.correction_tx.send(request).is_err() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn submit_prediction(&self, request: PredictionRequest) {
        self.board.publish(request.field, request.generation);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.prediction_tx.send(request).is_err() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn try_recv(&self) -> Option<WorkResult> {
        let rx = self.result_rx.lock().ok()?;
        rx.try_recv().ok()
    }

    /// Submitted requests whose result has not been delivered or dropped yet.
    pub fn has_pending_work(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) > 0
    }
}

// ---------------------------------------------------------------------------
// Worker threads
// ---------------------------------------------------------------------------

/// Keep only the newest queued request per field, in arrival order.
fn drain_latest<T>(first: T, rx: &mpsc::Receiver<T>, field_of: impl Fn(&T) -> FieldId) -> (Vec<T>, usize) {
    let mut queued = vec![first];
    while let Ok(newer) = rx.try_recv() {
        queued.push(newer);
    }
    let total = queued.len();
    let mut latest: Vec<T> = Vec::with_capacity(total);
    for work in queued {
        let field = field_of(&work);
        match latest.iter().position(|w| field_of(w) == field) {
            Some(i) => latest[i] = work,
            None => latest.push(work),
        }
    }
    (latest, total)
}

fn correction_worker(
    rx: mpsc::Receiver<CorrectionRequest>,
    tx: mpsc::Sender<WorkResult>,
    board: Arc<GenerationBoard>,
    outstanding: Arc<AtomicUsize>,
    client: Arc<CompletionClient>,
) {
    while let Ok(work) = rx.recv() {
        let (batch, total) = drain_latest(work, &rx, |w| w.field);
        let mut settled = total - batch.len();
        for req in batch {
            // Staleness before the call
            if !board.is_current(req.field, req.generation) {
                debug!(field = %req.field, req.generation, "skipping stale correction");
                settled += 1;
                continue;
            }
            let corrected = client.correct(&req.snapshot);
            // ...and after it
            if board.is_current(req.field, req.generation) {
                let _ = tx.send(WorkResult::Correction(CorrectionResult {
                    field: req.field,
                    generation: req.generation,
                    snapshot: req.snapshot,
                    corrected,
                }));
            }
            settled += 1;
        }
        outstanding.fetch_sub(settled, Ordering::SeqCst);
    }
}

fn prediction_worker(
    rx: mpsc::Receiver<PredictionRequest>,
    tx: mpsc::Sender<WorkResult>,
    board: Arc<GenerationBoard>,
    outstanding: Arc<AtomicUsize>,
    client: Arc<CompletionClient>,
) {
    while let Ok(work) = rx.recv() {
        let (batch, total) = drain_latest(work, &rx, |w| w.field);
        let mut settled = total - batch.len();
        for req in batch {
            if !board.is_current(req.field, req.generation) {
                settled += 1;
                continue;
            }
            let suggestion = client.predict_next(&req.text);
            if board.is_current(req.field, req.generation) {
                let _ = tx.send(WorkResult::Prediction(PredictionResult {
                    field: req.field,
                    generation: req.generation,
                    suggestion,
                }));
            }
            settled += 1;
        }
        outstanding.fetch_sub(settled, Ordering::SeqCst);
    }
}
