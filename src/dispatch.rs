//! Single-flight decode dispatch.
//!
//! A [`Dispatcher`] owns the reader configuration and an observer. Submitted
//! frames are resolved on the caller's thread, decoded on the rayon pool, and
//! the outcome is handed back to the owner thread through a channel. At most
//! one decode is in flight; a submission that arrives while one is running is
//! dropped and reported as [`Submission::Busy`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::barcode::Barcode;
use crate::error::ScanError;
use crate::limits::Limits;
use crate::options::{BarcodeFormats, ReaderOption, ReaderOptions, TextMode};
use crate::read::{BarcodeDecoder, convert_frame, decode_image, decode_mapped};
use crate::resolve::{LayoutMapping, resolve_image_format, resolve_video_format};
use crate::still::StillImage;
use crate::stop::StopToken;
use crate::video::VideoFrame;

/// Receives scan outcomes and configuration changes.
///
/// Every method runs on the thread that owns the [`Dispatcher`].
pub trait ScanObserver {
    fn barcode_found(&mut self, barcode: &Barcode);
    fn barcode_not_found(&mut self);
    fn option_changed(&mut self, _option: ReaderOption) {}
}

/// What happened to a submitted frame.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Queued on the worker pool. Exactly one found/not-found event follows.
    Accepted,
    /// A decode is already in flight; the frame was dropped without an event.
    Busy,
    /// The frame could not be prepared; `barcode_not_found` was already called.
    Failed,
}

enum Job {
    Frame {
        frame: Box<dyn VideoFrame>,
        mapping: LayoutMapping,
    },
    Image(StillImage<'static>),
}

enum Outcome {
    Found(Barcode),
    NotFound,
    Cancelled,
}

struct Completion {
    outcome: Outcome,
    elapsed: Duration,
}

/// Configures and builds a [`Dispatcher`].
pub struct DispatcherBuilder {
    decoder: Arc<dyn BarcodeDecoder>,
    observer: Box<dyn ScanObserver>,
    options: ReaderOptions,
    limits: Option<Limits>,
}

impl DispatcherBuilder {
    pub fn new(decoder: impl BarcodeDecoder, observer: impl ScanObserver + 'static) -> Self {
        Self {
            decoder: Arc::new(decoder),
            observer: Box::new(observer),
            options: ReaderOptions::default(),
            limits: None,
        }
    }

    /// Initial options. Not reported through `option_changed`.
    pub fn options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn build(self) -> Dispatcher {
        let (sender, receiver) = mpsc::channel();
        Dispatcher {
            decoder: self.decoder,
            observer: self.observer,
            options: self.options,
            limits: self.limits,
            in_flight: Arc::new(AtomicBool::new(false)),
            stop: StopToken::new(),
            sender,
            receiver,
            pending: 0,
            last_run_time: None,
        }
    }
}

/// Owns reader configuration and runs at most one decode at a time.
///
/// Outcomes are delivered when the owner calls [`Dispatcher::process_events`]
/// or [`Dispatcher::wait_for_event`]. Dropping the dispatcher cancels the
/// running decode; its outcome is discarded.
pub struct Dispatcher {
    decoder: Arc<dyn BarcodeDecoder>,
    observer: Box<dyn ScanObserver>,
    options: ReaderOptions,
    limits: Option<Limits>,
    in_flight: Arc<AtomicBool>,
    stop: StopToken,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    pending: usize,
    last_run_time: Option<Duration>,
}

macro_rules! forward_setters {
    ($($setter:ident, $ty:ty, $option:ident;)*) => {
        $(
            /// Returns `true` and notifies the observer only if the value changed.
            pub fn $setter(&mut self, value: $ty) -> bool {
                let changed = self.options.$setter(value);
                if changed {
                    self.observer.option_changed(ReaderOption::$option);
                }
                changed
            }
        )*
    };
}

impl Dispatcher {
    pub fn new(decoder: impl BarcodeDecoder, observer: impl ScanObserver + 'static) -> Self {
        DispatcherBuilder::new(decoder, observer).build()
    }

    pub fn builder(
        decoder: impl BarcodeDecoder,
        observer: impl ScanObserver + 'static,
    ) -> DispatcherBuilder {
        DispatcherBuilder::new(decoder, observer)
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    forward_setters! {
        set_formats, BarcodeFormats, Formats;
        set_try_harder, bool, TryHarder;
        set_try_rotate, bool, TryRotate;
        set_try_invert, bool, TryInvert;
        set_try_downscale, bool, TryDownscale;
        set_is_pure, bool, IsPure;
        set_max_number_of_symbols, u8, MaxNumberOfSymbols;
        set_text_mode, TextMode, TextMode;
    }

    /// Apply every field of `options`, notifying once per changed field.
    pub fn configure(&mut self, options: &ReaderOptions) {
        for option in self.options.assign(options) {
            self.observer.option_changed(option);
        }
    }

    /// Whether a decode is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Wall-clock time from submission to completion of the latest attempt.
    pub fn last_run_time(&self) -> Option<Duration> {
        self.last_run_time
    }

    /// Submit a video frame for decoding.
    pub fn submit_frame(&mut self, frame: impl VideoFrame) -> Submission {
        let started = Instant::now();
        if !self.acquire() {
            return Submission::Busy;
        }
        match self.prepare_frame(Box::new(frame)) {
            Ok(job) => self.spawn(job, started),
            Err(e) => self.fail(e, started),
        }
    }

    /// Submit a still image for decoding. Borrowed pixels are copied.
    pub fn submit_image(&mut self, image: StillImage<'_>) -> Submission {
        let started = Instant::now();
        if !self.acquire() {
            return Submission::Busy;
        }
        match self.prepare_image(image) {
            Ok(job) => self.spawn(job, started),
            Err(e) => self.fail(e, started),
        }
    }

    /// Deliver every completed outcome without blocking. Returns how many
    /// were delivered.
    pub fn process_events(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(completion) => {
                    self.deliver(completion);
                    delivered += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return delivered,
            }
        }
    }

    /// Block up to `timeout` for the next outcome, then deliver anything else
    /// that is ready. Returns `false` if nothing arrived.
    pub fn wait_for_event(&mut self, timeout: Duration) -> bool {
        if self.pending == 0 {
            return self.process_events() > 0;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(completion) => {
                self.deliver(completion);
                self.process_events();
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Cancel the running decode and wait for it to finish. No further
    /// observer calls are made.
    pub fn shutdown(mut self) {
        self.stop.cancel();
        while self.pending > 0 {
            if self.receiver.recv().is_err() {
                break;
            }
            self.pending -= 1;
        }
    }

    fn acquire(&self) -> bool {
        let acquired = self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !acquired {
            debug!("decode in flight, dropping submission");
        }
        acquired
    }

    fn prepare_frame(&self, frame: Box<dyn VideoFrame>) -> Result<Job, ScanError> {
        if let Some(limits) = &self.limits {
            limits.check(frame.width(), frame.height())?;
        }
        match resolve_video_format(frame.pixel_format()) {
            Some(mapping) => Ok(Job::Frame { frame, mapping }),
            None => {
                let image = convert_frame(&*frame)?;
                self.prepare_image(image)
            }
        }
    }

    fn prepare_image(&self, image: StillImage<'_>) -> Result<Job, ScanError> {
        if let Some(limits) = &self.limits {
            limits.check(image.width(), image.height())?;
        }
        let image = match resolve_image_format(image.format()) {
            Some(_) => image.into_owned(),
            None => image.to_gray8_within(self.limits.as_ref())?,
        };
        Ok(Job::Image(image))
    }

    fn fail(&mut self, e: ScanError, started: Instant) -> Submission {
        warn!(error = %e, "frame could not be prepared, reporting no barcode");
        self.in_flight.store(false, Ordering::Release);
        self.last_run_time = Some(started.elapsed());
        self.observer.barcode_not_found();
        Submission::Failed
    }

    fn spawn(&mut self, job: Job, started: Instant) -> Submission {
        let decoder = Arc::clone(&self.decoder);
        let options = self.options.clone().with_max_number_of_symbols(1);
        let limits = self.limits.clone();
        let stop = self.stop.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let sender = self.sender.clone();
        self.pending += 1;

        rayon::spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| match &job {
                Job::Frame { frame, mapping } => {
                    decode_mapped(&*decoder, &**frame, *mapping, &options, &stop)
                }
                Job::Image(image) => {
                    decode_image(&*decoder, image, &options, limits.as_ref(), &stop)
                }
            }));
            let outcome = match result {
                Ok(Ok(found)) => match found.into_iter().next() {
                    Some(barcode) => Outcome::Found(barcode),
                    None => Outcome::NotFound,
                },
                Ok(Err(ScanError::Cancelled(reason))) => {
                    debug!(?reason, "decode cancelled");
                    Outcome::Cancelled
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "decode failed, reporting no barcode");
                    Outcome::NotFound
                }
                Err(_) => {
                    error!("decoder panicked, reporting no barcode");
                    Outcome::NotFound
                }
            };
            let elapsed = started.elapsed();
            drop(job);
            in_flight.store(false, Ordering::Release);
            // The owner may already be gone.
            let _ = sender.send(Completion { outcome, elapsed });
        });
        Submission::Accepted
    }

    fn deliver(&mut self, completion: Completion) {
        self.pending = self.pending.saturating_sub(1);
        self.last_run_time = Some(completion.elapsed);
        match completion.outcome {
            Outcome::Found(barcode) => self.observer.barcode_found(&barcode),
            Outcome::NotFound => self.observer.barcode_not_found(),
            Outcome::Cancelled => {}
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
