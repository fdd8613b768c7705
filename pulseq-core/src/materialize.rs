use pulseq_types::{
    ClampStats, ControlEvent, EventIds, EventSlot, GradEvent, MaterializedBlock, SeqError,
    SeqResult, SeqVersion, NUM_GRADS,
};

use crate::{blocks::BlockTable, library::EventLibraries, shapes::ShapeLibrary};

/// Отношение растра градиентов к растру RF.
pub const GRAD_RASTER_FACTOR: i64 = 10;

/// Пределы выборок градиента.
pub const GRAD_MIN: f32 = -1.0;
pub const GRAD_MAX: f32 = 1.0;

/// Пределы амплитуды RF.
pub const RF_AMPLITUDE_MIN: f32 = 0.0;
pub const RF_AMPLITUDE_MAX: f32 = 1.0;

/// Пределы фазы RF: верхняя граница чуть меньше полного оборота.
pub const RF_PHASE_MIN: f32 = 0.0;
pub const RF_PHASE_MAX: f32 = (std::f64::consts::TAU - 1e-4) as f32;

/// Сборка конкретных блоков из загруженных библиотек.
///
/// Только читает библиотеки, поэтому один экземпляр можно использовать из
/// нескольких потоков одновременно. Каждый вызов создаёт новый блок.
#[derive(Debug, Clone, Copy)]
pub struct BlockMaterializer<'a> {
    version: SeqVersion,
    shapes: &'a ShapeLibrary,
    events: &'a EventLibraries,
    blocks: &'a BlockTable,
}

impl<'a> BlockMaterializer<'a> {
    pub fn new(
        version: SeqVersion,
        shapes: &'a ShapeLibrary,
        events: &'a EventLibraries,
        blocks: &'a BlockTable,
    ) -> Self {
        Self {
            version,
            shapes,
            events,
            blocks,
        }
    }

    /// Разыменовывает события блока `index` и вычисляет его длительность.
    ///
    /// Формы сигналов не распаковываются, см. [`Self::decode`].
    pub fn materialize(
        &self,
        index: usize,
    ) -> SeqResult<MaterializedBlock> {
        let ids = *self
            .blocks
            .get(index)
            .ok_or(SeqError::BlockIndexOutOfRange {
                index,
                len: self.blocks.len(),
            })?;

        let mut block = MaterializedBlock {
            index,
            event_ids: ids,
            ..Default::default()
        };

        if ids.rf != 0 {
            block.rf = Some(*self.lookup(index, &ids, EventSlot::Rf, self.events.rf(ids.rf))?);
        }

        for (ch, slot) in [EventSlot::Gx, EventSlot::Gy, EventSlot::Gz]
            .into_iter()
            .enumerate()
        {
            let id = ids.get(slot);
            if id != 0 {
                block.grad[ch] = Some(*self.lookup(index, &ids, slot, self.events.grad(id))?);
            }
        }

        if ids.adc != 0 {
            block.adc = Some(*self.lookup(index, &ids, EventSlot::Adc, self.events.adc(ids.adc))?);
        }

        if ids.ctrl != 0 {
            block.control = Some(*self.lookup(
                index,
                &ids,
                EventSlot::Ctrl,
                self.events.control(ids.ctrl),
            )?);
        }

        if ids.delay != 0 {
            block.delay = self.lookup(index, &ids, EventSlot::Delay, self.events.delay(ids.delay))?;
        }

        block.duration = block_duration(&block, self.shapes, &self.version)?;

        Ok(block)
    }

    /// Распаковывает формы блока и применяет ограничители.
    ///
    /// Фаза RF распаковывается только для проверки потока и не сохраняется.
    /// Возвращает число исправленных выборок.
    pub fn decode(
        &self,
        block: &mut MaterializedBlock,
    ) -> SeqResult<ClampStats> {
        if let Some(rf) = &block.rf {
            block.rf_amplitude = self.shapes.decompress(rf.mag_shape)?;
            self.shapes.decompress(rf.phase_shape)?;
        }

        for ch in 0..NUM_GRADS {
            if let Some(GradEvent::Arbitrary(g)) = &block.grad[ch] {
                block.grad_waveforms[ch] = self.shapes.decompress(g.shape)?;
            }
        }

        let mut stats = ClampStats {
            rf_amplitude: clamp_rf_amplitude(&mut block.rf_amplitude),
            rf_phase: clamp_rf_phase(&mut block.rf_phase),
            gradient: 0,
        };
        for wave in block.grad_waveforms.iter_mut() {
            stats.gradient += clamp_gradient(wave);
        }

        Ok(stats)
    }

    /// [`Self::materialize`] и [`Self::decode`] за один вызов.
    pub fn decoded(
        &self,
        index: usize,
    ) -> SeqResult<(MaterializedBlock, ClampStats)> {
        let mut block = self.materialize(index)?;
        let stats = self.decode(&mut block)?;
        Ok((block, stats))
    }

    pub fn version(&self) -> SeqVersion {
        self.version
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn lookup<T>(
        &self,
        index: usize,
        ids: &EventIds,
        slot: EventSlot,
        found: Option<T>,
    ) -> SeqResult<T> {
        found.ok_or_else(|| SeqError::Reference {
            block: index,
            declared_index: self
                .blocks
                .declared_index(index)
                .unwrap_or(index as i64 + 1),
            slot,
            id: ids.get(slot),
        })
    }
}

/// Длительность исполнения блока.
///
/// Максимум по каналам: длина огибающей RF, `10 × длина формы + задержка`
/// для градиента произвольной формы, полная длительность трапеции, окно
/// АЦП и длительность триггера. До версии 1.2.0 задержка блока
/// прибавляется к результату, начиная с 1.2.0 перекрывается с ним.
///
/// Переполнение `i64` даёт [`SeqError::DurationOverflow`].
pub fn block_duration(
    block: &MaterializedBlock,
    shapes: &ShapeLibrary,
    version: &SeqVersion,
) -> SeqResult<i64> {
    let overflow = || SeqError::DurationOverflow { block: block.index };
    let mut duration = 0i64;

    if let Some(rf) = &block.rf {
        let samples =
            i64::try_from(shapes.num_samples(rf.mag_shape)?).map_err(|_| overflow())?;
        duration = duration.max(samples);
    }

    for grad in block.grad.iter().flatten() {
        let candidate = match grad {
            GradEvent::Arbitrary(g) => i64::try_from(shapes.num_samples(g.shape)?)
                .ok()
                .and_then(|n| n.checked_mul(GRAD_RASTER_FACTOR))
                .and_then(|t| t.checked_add(g.delay)),
            GradEvent::Trapezoid(t) => t.total_time(),
        };
        duration = duration.max(candidate.ok_or_else(overflow)?);
    }

    if let Some(adc) = &block.adc {
        duration = duration.max(adc.total_time().ok_or_else(overflow)?);
    }

    if let Some(ControlEvent::Trigger(t)) = &block.control {
        duration = duration.max(t.duration);
    }

    if version.delay_overlaps() {
        Ok(duration.max(block.delay))
    } else {
        duration.checked_add(block.delay).ok_or_else(overflow)
    }
}

fn clamp_samples(
    samples: &mut [f32],
    lo: f32,
    hi: f32,
) -> usize {
    let mut changed = 0;
    for s in samples.iter_mut() {
        if *s < lo {
            *s = lo;
            changed += 1;
        } else if *s > hi {
            *s = hi;
            changed += 1;
        }
    }
    changed
}

/// Ограничивает выборки градиента диапазоном `[-1, 1]`.
pub fn clamp_gradient(samples: &mut [f32]) -> usize {
    clamp_samples(samples, GRAD_MIN, GRAD_MAX)
}

/// Ограничивает амплитуду RF диапазоном `[0, 1]`.
pub fn clamp_rf_amplitude(samples: &mut [f32]) -> usize {
    clamp_samples(samples, RF_AMPLITUDE_MIN, RF_AMPLITUDE_MAX)
}

/// Ограничивает фазу RF диапазоном `[0, 2π − 1e-4]`.
pub fn clamp_rf_phase(samples: &mut [f32]) -> usize {
    clamp_samples(samples, RF_PHASE_MIN, RF_PHASE_MAX)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use pulseq_types::{
        AdcEvent, ArbitraryGradient, CompressedShape, RfEvent, TrapezoidGradient, TriggerEvent,
    };
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::*;

    struct Fixture {
        shapes: ShapeLibrary,
        events: EventLibraries,
        blocks: BlockTable,
    }

    impl Fixture {
        fn new() -> Self {
            let mut shapes = ShapeLibrary::default();
            shapes.insert(1, CompressedShape::new(vec![1.0, 1.0, 3.0], 5));
            shapes.insert(2, CompressedShape::new(vec![0.0, 0.5, 0.5, 0.0, 0.0], 4));

            let mut events = EventLibraries::default();
            events.insert_rf(
                1,
                RfEvent {
                    amplitude: 250.0,
                    mag_shape: 1,
                    ..Default::default()
                },
            );
            events.insert_grad(
                1,
                GradEvent::Trapezoid(TrapezoidGradient {
                    amplitude: 1.0,
                    ramp_up_time: 100,
                    flat_time: 1000,
                    ramp_down_time: 100,
                    delay: 50,
                }),
            );
            events.insert_grad(
                2,
                GradEvent::Arbitrary(ArbitraryGradient {
                    amplitude: 1.0,
                    shape: 2,
                    delay: 5,
                }),
            );
            events.insert_adc(
                1,
                AdcEvent {
                    num_samples: 64,
                    dwell_time: 10_000,
                    delay: 20,
                    ..Default::default()
                },
            );
            events.insert_delay(1, 2000);
            events.insert_control(
                1,
                ControlEvent::Trigger(TriggerEvent {
                    trigger_type: 1,
                    duration: 900,
                }),
            );

            Self {
                shapes,
                events,
                blocks: BlockTable::default(),
            }
        }

        fn block(
            mut self,
            ids: [u32; 7],
        ) -> Self {
            let n = self.blocks.len() as i64 + 1;
            self.blocks.push(n, EventIds::from_array(ids));
            self
        }

        fn materializer(
            &self,
            version: SeqVersion,
        ) -> BlockMaterializer<'_> {
            BlockMaterializer::new(version, &self.shapes, &self.events, &self.blocks)
        }
    }

    #[test]
    fn test_trapezoid_with_block_delay_by_version() {
        // delay=1, gx=trap 1
        let fx = Fixture::new().block([1, 0, 1, 0, 0, 0, 0]);

        let legacy = fx.materializer(SeqVersion::new(1, 1, 1)).materialize(0).unwrap();
        assert_eq!(legacy.duration, 3250);

        let current = fx.materializer(SeqVersion::new(1, 2, 0)).materialize(0).unwrap();
        assert_eq!(current.duration, 2000);
    }

    #[test]
    fn test_duration_channel_maximum() {
        let fx = Fixture::new()
            .block([0, 1, 0, 0, 0, 0, 0])
            .block([0, 0, 0, 2, 0, 0, 0])
            .block([0, 0, 0, 0, 0, 1, 0])
            .block([0, 0, 0, 0, 0, 0, 1])
            .block([0, 1, 1, 2, 0, 1, 1]);
        let m = fx.materializer(SeqVersion::new(1, 2, 0));

        // RF: длина огибающей
        assert_eq!(m.materialize(0).unwrap().duration, 5);
        // форма: 10 × 4 + 5
        assert_eq!(m.materialize(1).unwrap().duration, 45);
        // АЦП: 20 + 64 × 10000 / 1000
        assert_eq!(m.materialize(2).unwrap().duration, 660);
        // триггер
        assert_eq!(m.materialize(3).unwrap().duration, 900);
        // максимум по всем каналам
        assert_eq!(m.materialize(4).unwrap().duration, 1250);
    }

    #[test]
    fn test_zero_slots_are_absent() {
        let mut fx = Fixture::new().block([0, 0, 0, 0, 0, 0, 0]);
        // даже если в библиотеке есть запись с id 0, слот 0 её не разыменовывает
        fx.events.insert_rf(0, RfEvent::default());
        fx.events.insert_delay(0, 777);

        let block = fx.materializer(SeqVersion::new(1, 2, 0)).materialize(0).unwrap();
        assert!(block.rf.is_none());
        assert!(block.grad.iter().all(Option::is_none));
        assert!(block.adc.is_none());
        assert!(block.control.is_none());
        assert_eq!(block.delay, 0);
        assert_eq!(block.duration, 0);
    }

    #[test]
    fn test_out_of_range_index() {
        let fx = Fixture::new().block([0; 7]);
        let err = fx.materializer(SeqVersion::default()).materialize(3).unwrap_err();
        assert!(matches!(
            err,
            SeqError::BlockIndexOutOfRange { index: 3, len: 1 }
        ));
    }

    #[test]
    fn test_duration_overflow_is_an_error() {
        let mut fx = Fixture::new();
        fx.events.insert_adc(
            2,
            AdcEvent {
                num_samples: 10_000_000_000,
                dwell_time: 10_000_000_000,
                ..Default::default()
            },
        );
        fx.shapes
            .insert(3, CompressedShape::new(Vec::new(), 1_000_000_000_000_000_000));
        fx.events.insert_grad(
            3,
            GradEvent::Arbitrary(ArbitraryGradient {
                amplitude: 1.0,
                shape: 3,
                delay: 0,
            }),
        );
        fx.events.insert_delay(2, i64::MAX);

        let fx = fx
            .block([0, 0, 0, 0, 0, 2, 0])
            .block([0, 0, 3, 0, 0, 0, 0])
            .block([2, 0, 1, 0, 0, 0, 0]);

        let legacy = fx.materializer(SeqVersion::new(1, 1, 0));
        for i in 0..3 {
            let err = legacy.materialize(i).unwrap_err();
            assert!(matches!(err, SeqError::DurationOverflow { block } if block == i));
        }

        // С 1.2.0 задержка перекрывается, а не складывается
        let current = fx.materializer(SeqVersion::new(1, 2, 0));
        assert_eq!(current.materialize(2).unwrap().duration, i64::MAX);
    }

    #[test]
    fn test_unresolved_event_reported() {
        let fx = Fixture::new().block([0, 9, 0, 0, 0, 0, 0]);
        let err = fx.materializer(SeqVersion::default()).materialize(0).unwrap_err();
        assert!(matches!(
            err,
            SeqError::Reference {
                slot: EventSlot::Rf,
                id: 9,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_fills_and_clamps() {
        let fx = Fixture::new().block([0, 1, 1, 2, 0, 0, 0]);
        let m = fx.materializer(SeqVersion::new(1, 2, 0));

        let (block, stats) = m.decoded(0).unwrap();

        // [1, 2, 3, 4, 5] → [1, 1, 1, 1, 1]
        assert_eq!(block.rf_amplitude, vec![1.0; 5]);
        assert_eq!(stats.rf_amplitude, 4);
        assert!(block.rf_phase.is_empty());

        // трапеция не имеет формы
        assert!(block.grad_waveforms[0].is_empty());
        assert_eq!(block.grad_waveforms[1].len(), 4);
        assert_relative_eq!(block.grad_waveforms[1][3], 1.0);
        assert!(block.grad_waveforms[2].is_empty());
        assert_eq!(stats.gradient, 0);
    }

    #[test]
    fn test_decode_missing_shape() {
        let mut fx = Fixture::new().block([0, 1, 0, 0, 0, 0, 0]);
        fx.events.insert_rf(
            1,
            RfEvent {
                mag_shape: 1,
                phase_shape: 42,
                ..Default::default()
            },
        );

        let m = fx.materializer(SeqVersion::new(1, 2, 0));
        let mut block = m.materialize(0).unwrap();
        assert!(matches!(m.decode(&mut block), Err(SeqError::MissingShape(42))));
    }

    #[test]
    fn test_clamp_bounds() {
        let mut g = vec![-3.0, -1.0, 0.2, 1.0, 7.5];
        assert_eq!(clamp_gradient(&mut g), 2);
        assert_eq!(g, vec![-1.0, -1.0, 0.2, 1.0, 1.0]);

        let mut a = vec![-0.1, 0.5, 1.1];
        assert_eq!(clamp_rf_amplitude(&mut a), 2);
        assert_eq!(a, vec![0.0, 0.5, 1.0]);

        let mut p = vec![-1.0, 3.0, 6.3];
        assert_eq!(clamp_rf_phase(&mut p), 2);
        assert_eq!(p[0], 0.0);
        assert_eq!(p[1], 3.0);
        assert_relative_eq!(p[2], RF_PHASE_MAX);
        assert!(RF_PHASE_MAX < std::f32::consts::TAU);
    }

    #[test]
    fn test_clamp_idempotent() {
        let mut rng = SmallRng::seed_from_u64(42);

        for _ in 0..100 {
            let len = rng.gen_range(0..200);
            let samples: Vec<f32> = (0..len).map(|_| rng.gen_range(-10.0f32..10.0)).collect();

            let clamps: [fn(&mut [f32]) -> usize; 3] =
                [clamp_gradient, clamp_rf_amplitude, clamp_rf_phase];
            for clamp in clamps {
                let mut once = samples.clone();
                clamp(&mut once);
                let mut twice = once.clone();
                assert_eq!(clamp(&mut twice), 0);
                assert_eq!(once, twice);
            }
        }
    }
}
