use std::collections::BTreeMap;

use pulseq_core::ExternalSequence;
use pulseq_types::{ClampStats, MaterializedBlock};
use serde::Serialize;

use crate::InspectResult;

/// Сводка загруженной последовательности.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceSummary {
    pub source: Option<String>,
    pub version: String,
    pub combined_version: i64,
    pub scan_id: i64,
    pub num_blocks: usize,
    pub num_shapes: usize,
    pub rf_events: usize,
    pub grad_events: usize,
    pub adc_events: usize,
    pub delay_events: usize,
    pub control_events: usize,
    pub definitions: BTreeMap<String, Vec<f64>>,
    /// Сумма длительностей блоков
    pub total_duration: i64,
}

/// Отчёт по одному блоку.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    #[serde(flatten)]
    pub block: MaterializedBlock,
    /// Исправленные выборки (только при декодировании)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamped: Option<ClampStats>,
}

/// Какие блоки показывать.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSelection {
    None,
    All,
    Indices(Vec<usize>),
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SequenceSummary {
    pub fn from_sequence(seq: &ExternalSequence) -> InspectResult<Self> {
        let definitions = seq
            .definitions()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect();

        Ok(Self {
            source: seq.source().map(|s| s.to_string()),
            version: seq.version().to_string(),
            combined_version: seq.version().combined(),
            scan_id: seq.scan_id(),
            num_blocks: seq.num_blocks(),
            num_shapes: seq.shape_library().len(),
            rf_events: seq.rf_library().len(),
            grad_events: seq.grad_library().len(),
            adc_events: seq.adc_library().len(),
            delay_events: seq.delay_library().len(),
            control_events: seq.control_library().len(),
            definitions,
            total_duration: seq.total_duration()?,
        })
    }
}

impl BlockSelection {
    pub fn indices(
        &self,
        num_blocks: usize,
    ) -> Vec<usize> {
        match self {
            BlockSelection::None => Vec::new(),
            BlockSelection::All => (0..num_blocks).collect(),
            BlockSelection::Indices(v) => v.clone(),
        }
    }
}

/// Материализует (и при `decode` декодирует) выбранные блоки.
pub fn inspect_blocks(
    seq: &ExternalSequence,
    selection: &BlockSelection,
    decode: bool,
) -> InspectResult<Vec<BlockReport>> {
    let m = seq.materializer();

    selection
        .indices(seq.num_blocks())
        .into_iter()
        .map(|i| {
            if decode {
                let (block, stats) = m.decoded(i)?;
                Ok(BlockReport {
                    block,
                    clamped: Some(stats),
                })
            } else {
                Ok(BlockReport {
                    block: m.materialize(i)?,
                    clamped: None,
                })
            }
        })
        .collect()
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for SequenceSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        if let Some(source) = &self.source {
            writeln!(f, "  Source        : {source}")?;
        }
        writeln!(
            f,
            "  Version       : {} ({})",
            self.version, self.combined_version
        )?;
        writeln!(f, "  Scan ID       : {}", self.scan_id)?;
        writeln!(f, "  Blocks        : {}", self.num_blocks)?;
        writeln!(f, "  Shapes        : {}", self.num_shapes)?;
        writeln!(
            f,
            "  Events        : RF {} / GRAD {} / ADC {} / DELAY {} / CONTROL {}",
            self.rf_events, self.grad_events, self.adc_events, self.delay_events, self.control_events
        )?;
        writeln!(f, "  Duration      : {}", self.total_duration)?;
        for (key, values) in &self.definitions {
            let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            writeln!(f, "  {key:<14}: {}", values.join(" "))?;
        }
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}

impl std::fmt::Display for BlockReport {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let b = &self.block;
        let ids = &b.event_ids;

        write!(
            f,
            "[{}] duration={} delay={} rf={} grad=[{} {} {}] adc={} ctrl={}",
            b.index, b.duration, b.delay, ids.rf, ids.gx, ids.gy, ids.gz, ids.adc, ids.ctrl
        )?;

        if let Some(stats) = &self.clamped {
            write!(
                f,
                " | samples rf={} grad=[{} {} {}] clamped={}",
                b.rf_amplitude.len(),
                b.grad_waveforms[0].len(),
                b.grad_waveforms[1].len(),
                b.grad_waveforms[2].len(),
                stats.total()
            )?;
        }

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
