//! Monitoramento de GPU NVIDIA via NVML (nvidia-ml).
//!
//! Carrega a biblioteca do driver dinamicamente — funciona com qualquer
//! driver NVIDIA. Sem GPU NVIDIA? `try_new()` retorna `None`.
//!
//! Toda leitura de campo é best-effort: falhou, loga um warning e o
//! campo fica com o zero do `Default` — o ciclo nunca aborta por causa
//! de um sensor.

use gpu_core::GpuRecord;
use nvml_wrapper::Nvml;
use nvml_wrapper::bitmasks::device::ThrottleReasons;
use nvml_wrapper::enum_wrappers::device::{Clock, EccCounter, MemoryError, TemperatureSensor};
use nvml_wrapper::enums::device::SampleValue;
use nvml_wrapper::structs::device::FieldId;
use nvml_wrapper::sys_exports::field_id::NVML_FI_DEV_MEMORY_TEMP;
use nvml_wrapper::{cuda_driver_version_major, cuda_driver_version_minor};
use tracing::{debug, info, warn};

/// Resumo estático de um dispositivo, listado uma vez no startup.
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub index: u32,
    pub name: String,
    pub pci_bus: u32,
    pub pci_device: u32,
    pub memory_total_mb: u64,
    pub ecc_enabled: bool,
    pub memory_clock_max_mhz: u32,
    pub memory_bus_width_bits: u32,
}

impl DeviceSummary {
    /// Banda de pico teórica da VRAM em GB/s (DDR: 2 transferências
    /// por ciclo de clock).
    pub fn peak_bandwidth_gbps(&self) -> f64 {
        2.0 * self.memory_clock_max_mhz as f64 * (self.memory_bus_width_bits as f64 / 8.0) / 1000.0
    }
}

/// Monitor de GPU NVIDIA via NVML.
///
/// A enumeração acontece uma única vez em [`NvmlMonitor::try_new`];
/// hotplug não é acompanhado.
pub struct NvmlMonitor {
    nvml: Nvml,
    device_count: u32,
}

impl NvmlMonitor {
    /// Tenta inicializar NVML. Retorna `None` se a biblioteca não
    /// estiver disponível ou se não houver GPU NVIDIA.
    pub fn try_new() -> Option<Self> {
        match Nvml::init() {
            Ok(nvml) => {
                let count = nvml.device_count().unwrap_or(0);
                if count > 0 {
                    if let Ok(dev) = nvml.device_by_index(0) {
                        let name = dev.name().unwrap_or_else(|_| "Unknown".into());
                        info!("✓ NVML: {name} ({count} GPU(s))");
                    } else {
                        info!("✓ NVML: {count} GPU(s) NVIDIA");
                    }
                    Some(Self {
                        nvml,
                        device_count: count,
                    })
                } else {
                    debug!("NVML init OK mas nenhuma GPU encontrada");
                    None
                }
            }
            Err(e) => {
                debug!("NVML não disponível: {e}");
                None
            }
        }
    }

    /// Número de GPUs capturado na enumeração inicial.
    pub fn device_count(&self) -> u32 {
        self.device_count
    }

    /// Versão do driver NVIDIA (ex: "560.35.03").
    pub fn driver_version(&self) -> Option<String> {
        self.nvml.sys_driver_version().ok()
    }

    /// Versão da biblioteca NVML (ex: "12.560.35.03").
    pub fn nvml_version(&self) -> Option<String> {
        self.nvml.sys_nvml_version().ok()
    }

    /// Versão do driver CUDA como (major, minor).
    pub fn cuda_driver_version(&self) -> Option<(i32, i32)> {
        self.nvml.sys_cuda_driver_version().ok().map(|v| {
            (cuda_driver_version_major(v), cuda_driver_version_minor(v))
        })
    }

    /// Lista as propriedades estáticas de cada GPU para o startup.
    ///
    /// Dispositivos que falham na consulta são pulados com warning em
    /// vez de derrubar a listagem inteira.
    pub fn device_summaries(&self) -> Vec<DeviceSummary> {
        let mut summaries = Vec::with_capacity(self.device_count as usize);

        for index in 0..self.device_count {
            let device = match self.nvml.device_by_index(index) {
                Ok(d) => d,
                Err(e) => {
                    warn!("GPU {index}: falha ao obter handle: {e}");
                    continue;
                }
            };

            let name = device.name().unwrap_or_else(|_| "Unknown".into());
            let (pci_bus, pci_device) = device
                .pci_info()
                .map(|pci| (pci.bus, pci.device))
                .unwrap_or((0, 0));
            let memory_total_mb = device
                .memory_info()
                .map(|mem| mem.total / (1024 * 1024))
                .unwrap_or(0);
            // ECC desligado e ECC não suportado viram ambos "OFF"
            let ecc_enabled = device
                .is_ecc_enabled()
                .map(|state| state.currently_enabled)
                .unwrap_or(false);
            let memory_clock_max_mhz = device.max_clock_info(Clock::Memory).unwrap_or(0);
            let memory_bus_width_bits = device.memory_bus_width().unwrap_or(0);

            summaries.push(DeviceSummary {
                index,
                name,
                pci_bus,
                pci_device,
                memory_total_mb,
                ecc_enabled,
                memory_clock_max_mhz,
                memory_bus_width_bits,
            });
        }

        summaries
    }

    /// Coleta um registro completo da GPU no índice especificado.
    ///
    /// Cada campo é consultado individualmente; falhas viram warning e
    /// o campo permanece zerado.
    pub fn sample(&self, index: u32) -> GpuRecord {
        let mut record = GpuRecord {
            index,
            ..Default::default()
        };

        let device = match self.nvml.device_by_index(index) {
            Ok(d) => d,
            Err(e) => {
                warn!("GPU {index}: falha ao obter handle: {e}");
                return record;
            }
        };

        // Utilização (%)
        match device.utilization_rates() {
            Ok(util) => {
                record.utilization_gpu = util.gpu;
                record.utilization_memory = util.memory;
            }
            Err(e) => warn!("GPU {index}: falha ao ler utilização: {e}"),
        }

        // VRAM (bytes)
        match device.memory_info() {
            Ok(mem) => {
                record.memory_total = mem.total;
                record.memory_free = mem.free;
                record.memory_used = mem.used;
            }
            Err(e) => warn!("GPU {index}: falha ao ler memória: {e}"),
        }

        // Temperatura do core (°C)
        match device.temperature(TemperatureSensor::Gpu) {
            Ok(temp) => record.temperature_gpu = temp,
            Err(e) => warn!("GPU {index}: falha ao ler temperatura: {e}"),
        }

        // Temperatura da memória — só existe via field-value API
        match device.field_values_for(&[FieldId(NVML_FI_DEV_MEMORY_TEMP)]) {
            Ok(mut values) => match values.pop() {
                Some(Ok(sample)) => {
                    record.temperature_memory = match sample.value {
                        Ok(SampleValue::U32(v)) => v,
                        Ok(SampleValue::U64(v)) => v as u32,
                        _ => 0,
                    };
                }
                Some(Err(e)) => {
                    warn!("GPU {index}: falha ao ler temperatura da memória: {e}");
                }
                None => {}
            },
            Err(e) => warn!("GPU {index}: falha ao ler temperatura da memória: {e}"),
        }

        // Performance state (P0–P15)
        match device.performance_state() {
            Ok(pstate) => record.pstate = pstate.as_c() as u32,
            Err(e) => warn!("GPU {index}: falha ao ler performance state: {e}"),
        }

        // Potência (mW, valores crus do NVML)
        match device.power_usage() {
            Ok(power) => record.power_draw = power,
            Err(e) => warn!("GPU {index}: falha ao ler potência: {e}"),
        }
        match device.enforced_power_limit() {
            Ok(limit) => record.enforced_power_limit = limit,
            Err(e) => warn!("GPU {index}: falha ao ler limite de potência: {e}"),
        }

        // Clock dos SMs (MHz)
        match device.clock_info(Clock::SM) {
            Ok(clock) => record.clocks_current_sm = clock,
            Err(e) => warn!("GPU {index}: falha ao ler clock SM: {e}"),
        }

        // Razões de throttle ativas (bitmask cru)
        match device.current_throttle_reasons() {
            Ok(reasons) => record.clocks_throttle_reasons_active = reasons.bits(),
            Err(e) => warn!("GPU {index}: falha ao ler razões de throttle: {e}"),
        }

        // ECC: contadores volatile, chaves mantêm o nome "aggregate"
        match device.total_ecc_errors(MemoryError::Uncorrected, EccCounter::Volatile) {
            Ok(count) => record.ecc_errors_uncorrected_total = count,
            Err(e) => warn!("GPU {index}: falha ao ler erros ECC não corrigidos: {e}"),
        }
        match device.total_ecc_errors(MemoryError::Corrected, EccCounter::Volatile) {
            Ok(count) => record.ecc_errors_corrected_total = count,
            Err(e) => warn!("GPU {index}: falha ao ler erros ECC corrigidos: {e}"),
        }

        debug!(
            "NVML: GPU {index} {}% {}°C {}MHz pstate={}",
            record.utilization_gpu,
            record.temperature_gpu,
            record.clocks_current_sm,
            record.pstate,
        );

        record
    }
}

// ──────────────────────────────────────────────
// Throttle reasons
// ──────────────────────────────────────────────

/// Nomes legíveis das razões de throttle ativas num bitmask NVML.
///
/// Bitmask vazio (ou só com bits desconhecidos) vira `"none"`.
pub fn describe_throttle_bits(bits: u64) -> String {
    const NAMES: &[(ThrottleReasons, &str)] = &[
        (ThrottleReasons::GPU_IDLE, "gpu_idle"),
        (
            ThrottleReasons::APPLICATIONS_CLOCKS_SETTING,
            "applications_clocks_setting",
        ),
        (ThrottleReasons::SW_POWER_CAP, "sw_power_cap"),
        (ThrottleReasons::HW_SLOWDOWN, "hw_slowdown"),
        (ThrottleReasons::SYNC_BOOST, "sync_boost"),
        (ThrottleReasons::SW_THERMAL_SLOWDOWN, "sw_thermal_slowdown"),
        (ThrottleReasons::HW_THERMAL_SLOWDOWN, "hw_thermal_slowdown"),
        (
            ThrottleReasons::HW_POWER_BRAKE_SLOWDOWN,
            "hw_power_brake_slowdown",
        ),
        (ThrottleReasons::DISPLAY_CLOCK_SETTING, "display_clock_setting"),
    ];

    let reasons = ThrottleReasons::from_bits_truncate(bits);
    let active: Vec<&str> = NAMES
        .iter()
        .filter(|(flag, _)| reasons.contains(*flag))
        .map(|(_, name)| *name)
        .collect();

    if active.is_empty() {
        "none".into()
    } else {
        active.join("+")
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
