//! Stage timings of sample loading, compiled out without the `profiling`
//! feature.
//!
//! Every loaded sample closes a sequence of named stages. Durations are
//! logged per sample at debug level and accumulated per stage for the whole
//! process. Set `SEALDL_PROFILING_STAGES` to a comma separated list of stage
//! names to restrict what is recorded.

use crate::common::*;
#[cfg(feature = "profiling")]
use dashmap::DashMap;
#[cfg(feature = "profiling")]
use lazy_static::lazy_static;

#[cfg(feature = "profiling")]
lazy_static! {
    static ref PROFILING_CONFIG: ProfilingConfig = {
        envy::prefixed("SEALDL_")
            .from_env::<ProfilingConfig>()
            .unwrap_or_else(|err| {
                warn!("ignore invalid profiling environment variables: {}", err);
                ProfilingConfig::default()
            })
    };
    static ref STAGE_STATS: DashMap<&'static str, StageStats> = DashMap::new();
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ProfilingConfig {
    /// Recorded stages. All stages are recorded when unset.
    pub profiling_stages: Option<Vec<String>>,
}

impl ProfilingConfig {
    pub fn is_recorded(&self, stage: &str) -> bool {
        self.profiling_stages
            .as_ref()
            .map_or(true, |stages| stages.iter().any(|name| name == stage))
    }
}

/// The accumulated duration of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageStats {
    pub count: usize,
    pub total: Duration,
}

impl StageStats {
    pub fn add(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
    }

    pub fn mean(&self) -> Option<Duration> {
        (self.count > 0).then(|| self.total / self.count as u32)
    }
}

/// Measures the stages of loading one sample.
#[cfg(feature = "profiling")]
#[derive(Debug)]
pub struct SampleTimer {
    id: String,
    instant: Instant,
}

#[cfg(not(feature = "profiling"))]
#[derive(Debug)]
pub struct SampleTimer;

impl SampleTimer {
    pub fn start(id: &str) -> Self {
        #[cfg(feature = "profiling")]
        {
            Self {
                id: id.to_owned(),
                instant: Instant::now(),
            }
        }

        #[cfg(not(feature = "profiling"))]
        {
            let _ = id;
            Self
        }
    }

    /// Close the stage that ran since the start or the previous stage.
    pub fn stage(&mut self, stage: &'static str) {
        #[cfg(feature = "profiling")]
        {
            let elapsed = self.instant.elapsed();
            self.instant = Instant::now();

            if PROFILING_CONFIG.is_recorded(stage) {
                debug!("{} of '{}' took {:?}", stage, self.id, elapsed);
                STAGE_STATS.entry(stage).or_default().add(elapsed);
            }
        }

        #[cfg(not(feature = "profiling"))]
        let _ = stage;
    }
}

/// The accumulated stage durations ordered by stage name.
pub fn stage_stats() -> Vec<(&'static str, StageStats)> {
    #[cfg(feature = "profiling")]
    {
        STAGE_STATS
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .sorted_by_key(|(stage, _)| *stage)
            .collect()
    }

    #[cfg(not(feature = "profiling"))]
    vec![]
}

/// Log the mean duration of every recorded stage.
pub fn report_stage_stats() {
    stage_stats().into_iter().for_each(|(stage, stats)| {
        if let Some(mean) = stats.mean() {
            info!("{}: {} samples, mean {:?}", stage, stats.count, mean);
        }
    });
}
