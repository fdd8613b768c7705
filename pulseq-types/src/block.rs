use serde::{Deserialize, Serialize};

use crate::{AdcEvent, ControlEvent, EventIds, GradEvent, RfEvent, TriggerEvent, NUM_GRADS};

/// Конкретные данные одного блока (создаются на каждый запрос, не кэшируются).
///
/// Отсутствующие события представлены `None`, отсутствующая задержка нулём.
/// Формы сигналов заполняются только после декодирования.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterializedBlock {
    /// Позиция блока в таблице (порядок чтения)
    pub index: usize,
    /// Идентификаторы событий блока
    pub event_ids: EventIds,
    pub rf: Option<RfEvent>,
    pub grad: [Option<GradEvent>; NUM_GRADS],
    pub adc: Option<AdcEvent>,
    pub control: Option<ControlEvent>,
    /// Задержка блока (единицы файла)
    pub delay: i64,
    /// Огибающая амплитуды RF после распаковки
    pub rf_amplitude: Vec<f32>,
    /// Фаза RF (не заполняется, см. декодер)
    pub rf_phase: Vec<f32>,
    /// Формы градиентов по каналам X, Y, Z
    pub grad_waveforms: [Vec<f32>; NUM_GRADS],
    /// Длительность исполнения блока
    pub duration: i64,
}

/// Сколько выборок было исправлено ограничителями при декодировании.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClampStats {
    pub rf_amplitude: usize,
    pub rf_phase: usize,
    pub gradient: usize,
}

impl MaterializedBlock {
    pub fn is_rf(&self) -> bool {
        self.rf.is_some()
    }

    pub fn is_adc(&self) -> bool {
        self.adc.is_some()
    }

    pub fn is_delay(&self) -> bool {
        self.event_ids.delay != 0
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self.control, Some(ControlEvent::Trigger(_)))
    }

    pub fn is_rotation(&self) -> bool {
        matches!(self.control, Some(ControlEvent::Rotation { .. }))
    }

    pub fn is_arbitrary_gradient(
        &self,
        channel: usize,
    ) -> bool {
        matches!(self.gradient(channel), Some(GradEvent::Arbitrary(_)))
    }

    pub fn is_trap_gradient(
        &self,
        channel: usize,
    ) -> bool {
        matches!(self.gradient(channel), Some(GradEvent::Trapezoid(_)))
    }

    /// Градиент канала `channel` (0..3), если он есть.
    pub fn gradient(
        &self,
        channel: usize,
    ) -> Option<&GradEvent> {
        self.grad.get(channel).and_then(|g| g.as_ref())
    }

    pub fn trigger(&self) -> Option<&TriggerEvent> {
        match &self.control {
            Some(ControlEvent::Trigger(t)) => Some(t),
            _ => None,
        }
    }

    pub fn rotation(&self) -> Option<&[[f64; 3]; 3]> {
        match &self.control {
            Some(ControlEvent::Rotation { rot_matrix }) => Some(rot_matrix),
            _ => None,
        }
    }
}

impl ClampStats {
    pub fn total(&self) -> usize {
        self.rf_amplitude + self.rf_phase + self.gradient
    }
}
