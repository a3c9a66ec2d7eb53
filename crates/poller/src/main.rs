//! # GPU Poller
//!
//! Enumera as GPUs NVIDIA via NVML e emite um registro JSON por GPU
//! por ciclo no stdout, até receber Ctrl-C.
//!
//! stdout carrega SOMENTE os registros; banner, listagem de GPUs e
//! diagnósticos vão para o stderr.
//!
//! ## Uso
//! ```bash
//! gpu_poller                 # config.toml ao lado do executável
//! gpu_poller outro.toml      # caminho de config explícito
//! gpu_poller | jq .          # um objeto JSON válido por linha
//! ```

mod nvml_gpu;

use gpu_core::config::AppConfig;
use gpu_core::record::{encode_record, FORMAT_VERSION};
use nvml_gpu::NvmlMonitor;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{error, info, warn};

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Carregar config ──
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let config = {
        let errors = config.validate();
        if errors.is_empty() {
            config
        } else {
            for err in &errors {
                warn!("Config inválida: {err}");
            }
            warn!("Continuando com a configuração padrão");
            AppConfig::default()
        }
    };

    let interval = config.poller.interval();

    // ── NVML ──
    let Some(monitor) = NvmlMonitor::try_new() else {
        error!("Nenhuma GPU NVIDIA disponível (driver ausente ou zero dispositivos)");
        std::process::exit(1);
    };

    // ── Ctrl-C ──
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!("Não foi possível instalar handler de Ctrl-C: {e}");
        }
    }

    // ── Banner ──
    let driver = monitor.driver_version().unwrap_or_else(|| "?".into());
    let nvml = monitor.nvml_version().unwrap_or_else(|| "?".into());
    let cuda = monitor
        .cuda_driver_version()
        .map(|(major, minor)| format!("{major}.{minor}"))
        .unwrap_or_else(|| "?".into());

    eprintln!();
    eprintln!("══════════════════════════════════════════════");
    eprintln!("   ⚡ GPU POLLER – ATIVO (Rust)");
    eprintln!("══════════════════════════════════════════════");
    eprintln!("  GPUs:      {}", monitor.device_count());
    eprintln!("  Driver:    {driver} (CUDA {cuda})");
    eprintln!("  NVML:      {nvml}");
    eprintln!("  Intervalo: {:.1}s", config.poller.interval_secs);
    eprintln!("  Formato:   JSON Lines v{FORMAT_VERSION}");
    eprintln!("══════════════════════════════════════════════");
    eprintln!();

    for summary in monitor.device_summaries() {
        info!(
            "GPU {}: {} | PCI {:02x}:{:02x} | {} MB | ECC {}",
            summary.index,
            summary.name,
            summary.pci_bus,
            summary.pci_device,
            summary.memory_total_mb,
            if summary.ecc_enabled { "ON" } else { "OFF" },
        );
        info!(
            "GPU {}: clock de memória {} MHz | barramento {} bits | banda de pico {:.1} GB/s",
            summary.index,
            summary.memory_clock_max_mhz,
            summary.memory_bus_width_bits,
            summary.peak_bandwidth_gbps(),
        );
    }

    // ── Loop principal ──
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    while running.load(Ordering::SeqCst) {
        let cycle_start = Instant::now();

        let records: Vec<_> = (0..monitor.device_count())
            .map(|index| monitor.sample(index))
            .collect();

        for record in &records {
            match encode_record(record) {
                Ok(line) => {
                    if let Err(e) = writeln!(out, "{line}") {
                        error!("Erro ao escrever no stdout: {e}");
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                Err(e) => error!("Erro ao serializar registro da GPU {}: {e}", record.index),
            }
        }
        if let Err(e) = out.flush() {
            error!("Erro no flush do stdout: {e}");
            break;
        }

        if let Some(first) = records.first() {
            info!(
                "→ {} registro(s) | GPU0 {}% {}°C {:.0}W | throttle: {}",
                records.len(),
                first.utilization_gpu,
                first.temperature_gpu,
                first.power_draw as f64 / 1000.0,
                nvml_gpu::describe_throttle_bits(first.clocks_throttle_reasons_active),
            );
        }

        // Dormir pelo tempo restante do intervalo
        let elapsed = cycle_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }

    info!("Encerrando; NVML é liberado no drop");
}
