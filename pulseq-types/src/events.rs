use serde::{Deserialize, Serialize};

/// Число каналов градиента (X, Y, Z).
pub const NUM_GRADS: usize = 3;

/// Число слотов событий в одном блоке.
pub const NUM_EVENTS: usize = 7;

/// RF-импульс.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RfEvent {
    /// Амплитуда (Гц)
    pub amplitude: f32,
    /// Форма огибающей амплитуды
    pub mag_shape: u32,
    /// Форма фазы
    pub phase_shape: u32,
    /// Задержка начала (0 для файлов до 1.2.0)
    pub delay: i64,
    /// Смещение частоты (Гц)
    pub freq_offset: f32,
    /// Смещение фазы (рад)
    pub phase_offset: f32,
}

/// Градиент произвольной формы.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArbitraryGradient {
    pub amplitude: f32,
    /// Всегда > 0
    pub shape: u32,
    pub delay: i64,
}

/// Трапецеидальный градиент.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrapezoidGradient {
    pub amplitude: f32,
    pub ramp_up_time: i64,
    pub flat_time: i64,
    pub ramp_down_time: i64,
    pub delay: i64,
}

/// Градиентное событие: форма либо трапеция.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GradEvent {
    Arbitrary(ArbitraryGradient),
    Trapezoid(TrapezoidGradient),
}

/// Окно сбора данных.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AdcEvent {
    /// Количество выборок
    pub num_samples: i64,
    /// Интервал дискретизации (нс)
    pub dwell_time: i64,
    pub delay: i64,
    pub freq_offset: f32,
    pub phase_offset: f32,
}

/// Внешний триггер.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub trigger_type: i32,
    pub duration: i64,
}

/// Управляющее событие: триггер или поворот системы координат градиентов.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlEvent {
    Trigger(TriggerEvent),
    Rotation {
        /// Матрица поворота 3×3, построчно
        rot_matrix: [[f64; 3]; 3],
    },
}

/// Слот события в строке блока, в порядке следования полей.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSlot {
    Delay,
    Rf,
    Gx,
    Gy,
    Gz,
    Adc,
    Ctrl,
}

/// Идентификаторы событий одного блока. 0 означает «событие отсутствует».
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventIds {
    pub delay: u32,
    pub rf: u32,
    pub gx: u32,
    pub gy: u32,
    pub gz: u32,
    pub adc: u32,
    pub ctrl: u32,
}

impl GradEvent {
    /// Задержка начала градиента.
    pub fn delay(&self) -> i64 {
        match self {
            GradEvent::Arbitrary(g) => g.delay,
            GradEvent::Trapezoid(g) => g.delay,
        }
    }

    pub fn amplitude(&self) -> f32 {
        match self {
            GradEvent::Arbitrary(g) => g.amplitude,
            GradEvent::Trapezoid(g) => g.amplitude,
        }
    }

    pub fn is_arbitrary(&self) -> bool {
        matches!(self, GradEvent::Arbitrary(_))
    }

    pub fn is_trapezoid(&self) -> bool {
        matches!(self, GradEvent::Trapezoid(_))
    }
}

impl TrapezoidGradient {
    /// Полная длительность трапеции с учётом задержки; `None` при
    /// переполнении.
    pub fn total_time(&self) -> Option<i64> {
        self.ramp_up_time
            .checked_add(self.flat_time)?
            .checked_add(self.ramp_down_time)?
            .checked_add(self.delay)
    }
}

impl AdcEvent {
    /// `delay + numSamples × dwellTime / 1000` (dwell в нс → единицы файла);
    /// `None` при переполнении.
    pub fn total_time(&self) -> Option<i64> {
        let window = self.num_samples.checked_mul(self.dwell_time)? / 1000;
        self.delay.checked_add(window)
    }
}

impl ControlEvent {
    pub fn is_trigger(&self) -> bool {
        matches!(self, ControlEvent::Trigger(_))
    }

    pub fn is_rotation(&self) -> bool {
        matches!(self, ControlEvent::Rotation { .. })
    }
}

impl EventSlot {
    /// Все слоты в порядке полей строки `[BLOCKS]`.
    pub const ALL: [EventSlot; NUM_EVENTS] = [
        EventSlot::Delay,
        EventSlot::Rf,
        EventSlot::Gx,
        EventSlot::Gy,
        EventSlot::Gz,
        EventSlot::Adc,
        EventSlot::Ctrl,
    ];

    /// Канал градиента для слотов Gx/Gy/Gz.
    pub fn grad_channel(&self) -> Option<usize> {
        match self {
            EventSlot::Gx => Some(0),
            EventSlot::Gy => Some(1),
            EventSlot::Gz => Some(2),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventSlot {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            EventSlot::Delay => "DELAY",
            EventSlot::Rf => "RF",
            EventSlot::Gx => "GX",
            EventSlot::Gy => "GY",
            EventSlot::Gz => "GZ",
            EventSlot::Adc => "ADC",
            EventSlot::Ctrl => "CTRL",
        };
        f.write_str(name)
    }
}

impl EventIds {
    /// Собирает идентификаторы из массива в порядке [`EventSlot::ALL`].
    pub fn from_array(ids: [u32; NUM_EVENTS]) -> Self {
        let [delay, rf, gx, gy, gz, adc, ctrl] = ids;
        Self {
            delay,
            rf,
            gx,
            gy,
            gz,
            adc,
            ctrl,
        }
    }

    pub fn get(
        &self,
        slot: EventSlot,
    ) -> u32 {
        match slot {
            EventSlot::Delay => self.delay,
            EventSlot::Rf => self.rf,
            EventSlot::Gx => self.gx,
            EventSlot::Gy => self.gy,
            EventSlot::Gz => self.gz,
            EventSlot::Adc => self.adc,
            EventSlot::Ctrl => self.ctrl,
        }
    }

    /// Идентификаторы градиентов по каналам X, Y, Z.
    pub fn grads(&self) -> [u32; NUM_GRADS] {
        [self.gx, self.gy, self.gz]
    }

    /// Пары (слот, id) для всех присутствующих событий.
    pub fn present(&self) -> impl Iterator<Item = (EventSlot, u32)> + '_ {
        EventSlot::ALL
            .into_iter()
            .map(move |slot| (slot, self.get(slot)))
            .filter(|&(_, id)| id != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ids_order() {
        let ids = EventIds::from_array([1, 2, 3, 4, 5, 6, 7]);
        let values: Vec<u32> = EventSlot::ALL.iter().map(|&s| ids.get(s)).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(ids.grads(), [3, 4, 5]);
    }

    #[test]
    fn test_present_skips_zero_slots() {
        let ids = EventIds::from_array([0, 5, 0, 0, 9, 0, 0]);
        let present: Vec<_> = ids.present().collect();
        assert_eq!(present, vec![(EventSlot::Rf, 5), (EventSlot::Gz, 9)]);
    }

    #[test]
    fn test_trapezoid_total_time() {
        let trap = TrapezoidGradient {
            amplitude: 1.0,
            ramp_up_time: 100,
            flat_time: 1000,
            ramp_down_time: 100,
            delay: 50,
        };
        assert_eq!(trap.total_time(), Some(1250));

        let huge = TrapezoidGradient {
            flat_time: i64::MAX,
            ..trap
        };
        assert_eq!(huge.total_time(), None);
    }

    #[test]
    fn test_adc_total_time_floors() {
        let adc = AdcEvent {
            num_samples: 3,
            dwell_time: 333,
            delay: 10,
            ..Default::default()
        };
        // 3 × 333 / 1000 = 0.999 → 0
        assert_eq!(adc.total_time(), Some(10));
    }

    #[test]
    fn test_adc_total_time_overflow() {
        let adc = AdcEvent {
            num_samples: 10_000_000_000,
            dwell_time: 10_000_000_000,
            ..Default::default()
        };
        assert_eq!(adc.total_time(), None);
    }

    #[test]
    fn test_grad_channel() {
        assert_eq!(EventSlot::Gx.grad_channel(), Some(0));
        assert_eq!(EventSlot::Gz.grad_channel(), Some(2));
        assert_eq!(EventSlot::Adc.grad_channel(), None);
    }
}
