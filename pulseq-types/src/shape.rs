use serde::{Deserialize, Serialize};

/// Сжатая форма сигнала (переменный размер).
///
/// `packed` хранит производную формы в виде литералов и серий
/// `value value count`; после распаковки получается ровно `num_samples`
/// выборок.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompressedShape {
    /// Упакованный поток производной
    pub packed: Vec<f32>,
    /// Объявленное количество выборок после распаковки
    pub num_samples: usize,
}

impl CompressedShape {
    pub fn new(
        packed: Vec<f32>,
        num_samples: usize,
    ) -> Self {
        Self {
            packed,
            num_samples,
        }
    }
}
