//! Loop scheduling policies and the partitions they produce.

use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Name of the environment variable a `Schedule` is read from.
pub const SCHEDULE_ENV: &str = "OMP_SCHEDULE";

/// How the outer row range of a kernel is divided among the execution units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleKind {
    /// Chunks are assigned to units up front, in round robin order.
    Static,
    /// Units take the next fixed-size chunk from a shared queue when they become idle.
    Dynamic,
    /// Like `Dynamic`, but chunk sizes shrink with the remaining work.
    Guided,
    /// Left to the implementation. Resolved to the static even split; a chunk size is ignored.
    Auto,
}

impl ScheduleKind {
    /// All kinds, in declaration order.
    pub const ALL: [ScheduleKind; 4] = [
        ScheduleKind::Static,
        ScheduleKind::Dynamic,
        ScheduleKind::Guided,
        ScheduleKind::Auto,
    ];

    /// Lowercase name, as accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            ScheduleKind::Static => "static",
            ScheduleKind::Dynamic => "dynamic",
            ScheduleKind::Guided => "guided",
            ScheduleKind::Auto => "auto",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScheduleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        ScheduleKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::schedule(format!("unknown schedule kind '{}'", s)))
    }
}

/// A scheduling policy: the kind plus an optional chunk size.
///
/// Without a chunk size, `Static` splits the rows into one contiguous block per unit, while
/// `Dynamic` and `Guided` use a minimum chunk of one row.
///
/// ```
/// use lopsided::{Schedule, ScheduleKind};
///
/// let schedule: Schedule = "dynamic,16".parse().unwrap();
/// assert_eq!(schedule.kind, ScheduleKind::Dynamic);
/// assert_eq!(schedule.chunk_size(), 16);
/// assert_eq!(schedule.to_string(), "dynamic,16");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Schedule {
    /// The partitioning strategy.
    pub kind: ScheduleKind,
    /// The chunk size, `None` for the implementation default.
    pub chunk: Option<NonZeroUsize>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new(ScheduleKind::Static)
    }
}

impl Schedule {
    /// A schedule of the given kind with the default chunk size.
    pub fn new(kind: ScheduleKind) -> Self {
        Self { kind, chunk: None }
    }

    /// A schedule of the given kind with an explicit chunk size. A chunk of zero means the
    /// default.
    pub fn with_chunk(kind: ScheduleKind, chunk: usize) -> Self {
        Self {
            kind,
            chunk: NonZeroUsize::new(chunk),
        }
    }

    /// Reads the schedule from `OMP_SCHEDULE`.
    ///
    /// An unset variable gives the default schedule. An unparsable one is reported and ignored.
    pub fn from_env() -> Self {
        match std::env::var(SCHEDULE_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|err| {
                tracing::warn!(%value, %err, "ignoring {}", SCHEDULE_ENV);
                Schedule::default()
            }),
            Err(_) => Schedule::default(),
        }
    }

    /// The chunk size in force, as reported to the user. Zero stands for the static even split.
    pub fn chunk_size(&self) -> usize {
        match (self.kind, self.chunk) {
            (ScheduleKind::Auto, _) | (ScheduleKind::Static, None) => 0,
            (_, Some(chunk)) => chunk.get(),
            (ScheduleKind::Dynamic, None) | (ScheduleKind::Guided, None) => 1,
        }
    }

    /// Divides `rows` into chunks for a team of `units` execution units.
    ///
    /// The chunks are contiguous, in ascending order, and cover `rows` exactly once.
    pub fn partition(&self, rows: Range<usize>, units: usize) -> Partition {
        let units = units.max(1);
        let len = rows.end.saturating_sub(rows.start);
        let min_chunk = self.chunk.map_or(1, NonZeroUsize::get);

        let mut chunks = Vec::new();
        let mut start = rows.start;
        let mut push = |size: usize| {
            chunks.push(start..start + size);
            start += size;
        };

        let dispatch = match (self.kind, self.chunk) {
            (ScheduleKind::Static, None) | (ScheduleKind::Auto, _) => {
                let (base, extra) = (len / units, len % units);
                for unit in 0..units.min(len) {
                    push(base + usize::from(unit < extra));
                }
                Dispatch::RoundRobin
            }
            (ScheduleKind::Static, Some(_)) => {
                for offset in (0..len).step_by(min_chunk) {
                    push(min_chunk.min(len - offset));
                }
                Dispatch::RoundRobin
            }
            (ScheduleKind::Dynamic, _) => {
                for offset in (0..len).step_by(min_chunk) {
                    push(min_chunk.min(len - offset));
                }
                Dispatch::Queue
            }
            (ScheduleKind::Guided, _) => {
                let mut remaining = len;
                while remaining > 0 {
                    let size = ((remaining + units - 1) / units)
                        .max(min_chunk)
                        .min(remaining);
                    push(size);
                    remaining -= size;
                }
                Dispatch::Queue
            }
        };

        Partition { chunks, dispatch }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chunk {
            Some(chunk) => write!(f, "{},{}", self.kind, chunk),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl FromStr for Schedule {
    type Err = Error;

    /// Parses `[modifier:]kind[,chunk]`. The `monotonic` and `nonmonotonic` modifiers are
    /// accepted and have no effect.
    fn from_str(s: &str) -> Result<Self> {
        let s = match s.split_once(':') {
            Some((modifier, rest)) => {
                let modifier = modifier.trim();
                if !modifier.eq_ignore_ascii_case("monotonic")
                    && !modifier.eq_ignore_ascii_case("nonmonotonic")
                {
                    return Err(Error::schedule(format!("unknown modifier '{}'", modifier)));
                }
                rest
            }
            None => s,
        };

        let (kind, chunk) = match s.split_once(',') {
            Some((kind, chunk)) => {
                let chunk = chunk
                    .trim()
                    .parse::<NonZeroUsize>()
                    .map_err(|_| Error::schedule(format!("invalid chunk size '{}'", chunk.trim())))?;
                (kind, Some(chunk))
            }
            None => (s, None),
        };

        Ok(Self {
            kind: kind.parse()?,
            chunk,
        })
    }
}

/// How the chunks of a `Partition` reach the execution units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Chunk `k` is handled by unit `k % units`.
    RoundRobin,
    /// Units pull chunks from a shared queue in ascending order.
    Queue,
}

/// The chunks a schedule divides a row range into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Contiguous, ascending and disjoint chunks of rows.
    pub chunks: Vec<Range<usize>>,
    /// How the chunks are handed out.
    pub dispatch: Dispatch,
}

impl Partition {
    /// The rows unit `unit` handles under round robin dispatch, or `None` for queue dispatch
    /// where that is only decided at run time.
    pub fn assigned_to(&self, unit: usize, units: usize) -> Option<Vec<Range<usize>>> {
        match self.dispatch {
            Dispatch::RoundRobin => Some(
                self.chunks
                    .iter()
                    .skip(unit)
                    .step_by(units.max(1))
                    .cloned()
                    .collect(),
            ),
            Dispatch::Queue => None,
        }
    }
}
