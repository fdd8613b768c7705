use std::{
    collections::BTreeMap,
    io::{BufRead, Seek},
};

use pulseq_types::{
    AdcEvent, ArbitraryGradient, ControlEvent, DiagnosticSink, EventSlot, GradEvent,
    MessageLevel, RfEvent, SeqResult, SeqVersion, TrapezoidGradient, TriggerEvent,
};

use crate::{
    format::{
        SECTION_ADC, SECTION_DELAYS, SECTION_GRADIENTS, SECTION_RF, SECTION_ROTATIONS,
        SECTION_TRAP, SECTION_TRIGGERS,
    },
    text::{Fields, LineReader},
    SectionIndex,
};

/// Запись секции событий: id в первом поле, затем поля фиксированного
/// числа, зависящего от версии файла.
pub trait EventRecord: Sized {
    /// Тег секции, из которой читается запись
    const SECTION: &'static str;

    /// Полное число полей записи (вместе с id).
    fn arity(version: &SeqVersion) -> usize;

    /// Разбирает поля после id. Число полей уже проверено.
    fn from_fields(
        fields: &Fields<'_>,
        version: &SeqVersion,
    ) -> SeqResult<Self>;
}

/// Длительность задержки из `[DELAYS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRecord(pub i64);

/// Матрица поворота из `[ROTATIONS]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationRecord(pub [[f64; 3]; 3]);

/// Библиотеки событий, на которые ссылаются блоки.
///
/// Градиенты `[GRADIENTS]` и `[TRAP]` делят одно пространство id, как и
/// `[TRIGGERS]` с `[ROTATIONS]`. Повторный id перезаписывает запись.
#[derive(Debug, Clone, Default)]
pub struct EventLibraries {
    rf: BTreeMap<u32, RfEvent>,
    grad: BTreeMap<u32, GradEvent>,
    adc: BTreeMap<u32, AdcEvent>,
    delay: BTreeMap<u32, i64>,
    control: BTreeMap<u32, ControlEvent>,
}

////////////////////////////////////////////////////////////////////////////////
// Разбор записей
////////////////////////////////////////////////////////////////////////////////

impl EventRecord for RfEvent {
    const SECTION: &'static str = SECTION_RF;

    fn arity(version: &SeqVersion) -> usize {
        if version.has_rf_delay() {
            7
        } else {
            6
        }
    }

    fn from_fields(
        f: &Fields<'_>,
        version: &SeqVersion,
    ) -> SeqResult<Self> {
        let (delay, tail) = if version.has_rf_delay() {
            (f.int(4, "delay")?, 5)
        } else {
            (0, 4)
        };

        Ok(RfEvent {
            amplitude: f.float(1, "amplitude")?,
            mag_shape: f.id(2, "mag shape")?,
            phase_shape: f.id(3, "phase shape")?,
            delay,
            freq_offset: f.float(tail, "freq offset")?,
            phase_offset: f.float(tail + 1, "phase offset")?,
        })
    }
}

impl EventRecord for ArbitraryGradient {
    const SECTION: &'static str = SECTION_GRADIENTS;

    fn arity(version: &SeqVersion) -> usize {
        if version.has_grad_delay() {
            4
        } else {
            3
        }
    }

    fn from_fields(
        f: &Fields<'_>,
        version: &SeqVersion,
    ) -> SeqResult<Self> {
        let shape = f.id(2, "shape")?;
        if shape == 0 {
            return Err(f.error("arbitrary gradient must reference a shape"));
        }

        Ok(ArbitraryGradient {
            amplitude: f.float(1, "amplitude")?,
            shape,
            delay: if version.has_grad_delay() {
                f.int(3, "delay")?
            } else {
                0
            },
        })
    }
}

impl EventRecord for TrapezoidGradient {
    const SECTION: &'static str = SECTION_TRAP;

    fn arity(version: &SeqVersion) -> usize {
        if version.has_grad_delay() {
            6
        } else {
            5
        }
    }

    fn from_fields(
        f: &Fields<'_>,
        version: &SeqVersion,
    ) -> SeqResult<Self> {
        Ok(TrapezoidGradient {
            amplitude: f.float(1, "amplitude")?,
            ramp_up_time: f.int(2, "ramp up time")?,
            flat_time: f.int(3, "flat time")?,
            ramp_down_time: f.int(4, "ramp down time")?,
            delay: if version.has_grad_delay() {
                f.int(5, "delay")?
            } else {
                0
            },
        })
    }
}

impl EventRecord for AdcEvent {
    const SECTION: &'static str = SECTION_ADC;

    fn arity(_version: &SeqVersion) -> usize {
        6
    }

    fn from_fields(
        f: &Fields<'_>,
        _version: &SeqVersion,
    ) -> SeqResult<Self> {
        Ok(AdcEvent {
            num_samples: f.int(1, "num samples")?,
            dwell_time: f.int(2, "dwell time")?,
            delay: f.int(3, "delay")?,
            freq_offset: f.float(4, "freq offset")?,
            phase_offset: f.float(5, "phase offset")?,
        })
    }
}

impl EventRecord for DelayRecord {
    const SECTION: &'static str = SECTION_DELAYS;

    fn arity(_version: &SeqVersion) -> usize {
        2
    }

    fn from_fields(
        f: &Fields<'_>,
        _version: &SeqVersion,
    ) -> SeqResult<Self> {
        Ok(DelayRecord(f.int(1, "delay")?))
    }
}

impl EventRecord for TriggerEvent {
    const SECTION: &'static str = SECTION_TRIGGERS;

    fn arity(_version: &SeqVersion) -> usize {
        3
    }

    fn from_fields(
        f: &Fields<'_>,
        _version: &SeqVersion,
    ) -> SeqResult<Self> {
        Ok(TriggerEvent {
            trigger_type: f.parse(1, "trigger type")?,
            duration: f.int(2, "duration")?,
        })
    }
}

impl EventRecord for RotationRecord {
    const SECTION: &'static str = SECTION_ROTATIONS;

    fn arity(_version: &SeqVersion) -> usize {
        10
    }

    fn from_fields(
        f: &Fields<'_>,
        _version: &SeqVersion,
    ) -> SeqResult<Self> {
        let mut m = [[0.0f64; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = f.double(1 + i * 3 + j, "rotation matrix entry")?;
            }
        }
        Ok(RotationRecord(m))
    }
}

/// Читает все записи секции `T::SECTION`. Отсутствующая секция даёт пустой
/// список; записи возвращаются в порядке файла.
pub fn parse_records<T, R>(
    reader: &mut LineReader<R>,
    index: &SectionIndex,
    version: &SeqVersion,
    sink: &dyn DiagnosticSink,
) -> SeqResult<Vec<(u32, T)>>
where
    T: EventRecord,
    R: BufRead + Seek,
{
    let mut records = Vec::new();

    if !index.seek(reader, T::SECTION)? {
        return Ok(records);
    }

    sink.emit(
        MessageLevel::DebugMedium,
        &format!("decoding {} section", T::SECTION),
    );

    let arity = T::arity(version);

    while let Some(line) = reader.read_record()? {
        let fields = Fields::split(T::SECTION, &line);
        fields.expect_exact(arity)?;

        let id = fields.id(0, "id")?;
        records.push((id, T::from_fields(&fields, version)?));
    }

    Ok(records)
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl EventLibraries {
    /// Читает все секции событий одного физического файла.
    pub fn parse<R: BufRead + Seek>(
        reader: &mut LineReader<R>,
        index: &SectionIndex,
        version: &SeqVersion,
        sink: &dyn DiagnosticSink,
    ) -> SeqResult<Self> {
        let mut libs = Self::default();

        libs.rf
            .extend(parse_records::<RfEvent, _>(reader, index, version, sink)?);

        // [TRAP] читается после [GRADIENTS] и перекрывает совпадающие id
        for (id, g) in parse_records::<ArbitraryGradient, _>(reader, index, version, sink)? {
            libs.grad.insert(id, GradEvent::Arbitrary(g));
        }
        for (id, g) in parse_records::<TrapezoidGradient, _>(reader, index, version, sink)? {
            libs.grad.insert(id, GradEvent::Trapezoid(g));
        }

        libs.adc
            .extend(parse_records::<AdcEvent, _>(reader, index, version, sink)?);

        for (id, DelayRecord(d)) in parse_records::<DelayRecord, _>(reader, index, version, sink)? {
            libs.delay.insert(id, d);
        }

        for (id, t) in parse_records::<TriggerEvent, _>(reader, index, version, sink)? {
            libs.control.insert(id, ControlEvent::Trigger(t));
        }
        for (id, RotationRecord(m)) in
            parse_records::<RotationRecord, _>(reader, index, version, sink)?
        {
            libs.control
                .insert(id, ControlEvent::Rotation { rot_matrix: m });
        }

        sink.emit(
            MessageLevel::DebugHigh,
            &format!(
                "-- EVENTS READ: RF: {} GRAD: {} ADC: {} DELAY: {} CONTROL: {}",
                libs.rf.len(),
                libs.grad.len(),
                libs.adc.len(),
                libs.delay.len(),
                libs.control.len()
            ),
        );

        Ok(libs)
    }

    /// Есть ли в библиотеке слота `slot` событие с данным id.
    pub fn contains(
        &self,
        slot: EventSlot,
        id: u32,
    ) -> bool {
        match slot {
            EventSlot::Delay => self.delay.contains_key(&id),
            EventSlot::Rf => self.rf.contains_key(&id),
            EventSlot::Gx | EventSlot::Gy | EventSlot::Gz => self.grad.contains_key(&id),
            EventSlot::Adc => self.adc.contains_key(&id),
            EventSlot::Ctrl => self.control.contains_key(&id),
        }
    }

    pub fn rf(
        &self,
        id: u32,
    ) -> Option<&RfEvent> {
        self.rf.get(&id)
    }

    pub fn grad(
        &self,
        id: u32,
    ) -> Option<&GradEvent> {
        self.grad.get(&id)
    }

    pub fn adc(
        &self,
        id: u32,
    ) -> Option<&AdcEvent> {
        self.adc.get(&id)
    }

    pub fn delay(
        &self,
        id: u32,
    ) -> Option<i64> {
        self.delay.get(&id).copied()
    }

    pub fn control(
        &self,
        id: u32,
    ) -> Option<&ControlEvent> {
        self.control.get(&id)
    }

    pub fn rf_library(&self) -> &BTreeMap<u32, RfEvent> {
        &self.rf
    }

    pub fn grad_library(&self) -> &BTreeMap<u32, GradEvent> {
        &self.grad
    }

    pub fn adc_library(&self) -> &BTreeMap<u32, AdcEvent> {
        &self.adc
    }

    pub fn delay_library(&self) -> &BTreeMap<u32, i64> {
        &self.delay
    }

    pub fn control_library(&self) -> &BTreeMap<u32, ControlEvent> {
        &self.control
    }

    pub fn insert_rf(
        &mut self,
        id: u32,
        rf: RfEvent,
    ) {
        self.rf.insert(id, rf);
    }

    pub fn insert_grad(
        &mut self,
        id: u32,
        grad: GradEvent,
    ) {
        self.grad.insert(id, grad);
    }

    pub fn insert_adc(
        &mut self,
        id: u32,
        adc: AdcEvent,
    ) {
        self.adc.insert(id, adc);
    }

    pub fn insert_delay(
        &mut self,
        id: u32,
        delay: i64,
    ) {
        self.delay.insert(id, delay);
    }

    pub fn insert_control(
        &mut self,
        id: u32,
        control: ControlEvent,
    ) {
        self.control.insert(id, control);
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
