//! Пример: загрузка последовательности и обход блоков
//!
//! Демонстрирует:
//! - загрузку единого файла или каталога с раздельными файлами
//! - материализацию и декодирование первых блоков
//! - суммарную длительность последовательности

use pulseq_core::ExternalSequence;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "pulseq-core/external.seq".to_string());

    let seq = ExternalSequence::load(&input_path)?;

    println!("✓ Sequence loaded");
    println!("  Version        : {}", seq.version());
    println!("  Scan ID        : {}", seq.scan_id());
    println!("  Blocks         : {}", seq.num_blocks());
    println!("  Shapes         : {}", seq.shape_library().len());
    println!("  Total duration : {}", seq.total_duration()?);

    println!("\nFirst blocks:");
    for i in 0..seq.num_blocks().min(5) {
        let (block, clamped) = seq.decoded_block(i)?;
        println!(
            "  [{i}] duration={} rf={} adc={} grads=[{}, {}, {}] clamped={}",
            block.duration,
            block.rf_amplitude.len(),
            block.is_adc(),
            block.grad_waveforms[0].len(),
            block.grad_waveforms[1].len(),
            block.grad_waveforms[2].len(),
            clamped.total()
        );
    }

    Ok(())
}
