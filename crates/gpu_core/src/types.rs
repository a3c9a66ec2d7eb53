//! Definição dos tipos de registro de telemetria de GPU.
//!
//! Os nomes das chaves JSON seguem o formato de consulta do nvidia-smi
//! (`utilization.gpu`, `memory.total`, …) e as unidades são as cruas do
//! NVML: memória em bytes, potência em miliwatts, clocks em MHz.

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Registro por GPU
// ──────────────────────────────────────────────

/// Uma amostra de telemetria de uma GPU, emitida como um objeto JSON
/// por linha no stdout.
///
/// Campos que falham na consulta ficam com o valor zero do `Default`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GpuRecord {
    /// Índice do dispositivo na enumeração NVML
    pub index: u32,
    /// Utilização do core (0–100%)
    #[serde(rename = "utilization.gpu")]
    pub utilization_gpu: u32,
    /// Utilização do controlador de memória (0–100%)
    #[serde(rename = "utilization.memory")]
    pub utilization_memory: u32,
    /// VRAM total (bytes)
    #[serde(rename = "memory.total")]
    pub memory_total: u64,
    /// VRAM livre (bytes)
    #[serde(rename = "memory.free")]
    pub memory_free: u64,
    /// VRAM em uso (bytes)
    #[serde(rename = "memory.used")]
    pub memory_used: u64,
    /// Temperatura do core (°C)
    #[serde(rename = "temperature.gpu")]
    pub temperature_gpu: u32,
    /// Temperatura da memória/HBM (°C), via field-value API do NVML
    #[serde(rename = "temperature.memory")]
    pub temperature_memory: u32,
    /// Performance state (P0=0 … P15=15, 32 = desconhecido)
    pub pstate: u32,
    /// Potência instantânea (mW)
    #[serde(rename = "power.draw")]
    pub power_draw: u32,
    /// Limite de potência aplicado pelo driver (mW)
    #[serde(rename = "enforced.power.limit")]
    pub enforced_power_limit: u32,
    /// Clock atual dos SMs (MHz)
    #[serde(rename = "clocks.current.sm")]
    pub clocks_current_sm: u32,
    /// Bitmask cru de razões de throttle ativas
    #[serde(rename = "clocks_throttle_reasons.active")]
    pub clocks_throttle_reasons_active: u64,
    /// Erros ECC não corrigidos (contadores volatile; a chave usa o
    /// nome "aggregate" do nvidia-smi)
    #[serde(rename = "ecc.errors.uncorrected.aggregate.total")]
    pub ecc_errors_uncorrected_total: u64,
    /// Erros ECC corrigidos (idem)
    #[serde(rename = "ecc.errors.corrected.aggregate.total")]
    pub ecc_errors_corrected_total: u64,
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_zeroed() {
        let r = GpuRecord::default();
        assert_eq!(r.index, 0);
        assert_eq!(r.utilization_gpu, 0);
        assert_eq!(r.memory_total, 0);
        assert_eq!(r.clocks_throttle_reasons_active, 0);
        assert_eq!(r.ecc_errors_corrected_total, 0);
    }

    #[test]
    fn json_keys_match_nvidia_smi_fields() {
        let r = GpuRecord {
            index: 1,
            utilization_gpu: 97,
            memory_used: 8 * 1024 * 1024 * 1024,
            temperature_memory: 62,
            power_draw: 285_000,
            ..Default::default()
        };
        let v: serde_json::Value = serde_json::to_value(&r).unwrap();
        let obj = v.as_object().unwrap();

        for key in [
            "index",
            "utilization.gpu",
            "utilization.memory",
            "memory.total",
            "memory.free",
            "memory.used",
            "temperature.gpu",
            "temperature.memory",
            "pstate",
            "power.draw",
            "enforced.power.limit",
            "clocks.current.sm",
            "clocks_throttle_reasons.active",
            "ecc.errors.uncorrected.aggregate.total",
            "ecc.errors.corrected.aggregate.total",
        ] {
            assert!(obj.contains_key(key), "chave ausente: {key}");
        }
        assert_eq!(obj.len(), 15);
        assert_eq!(obj["utilization.gpu"], 97);
        assert_eq!(obj["power.draw"], 285_000);
    }

    #[test]
    fn missing_keys_deserialize_as_zero() {
        let r: GpuRecord = serde_json::from_str(r#"{"index":3,"temperature.gpu":71}"#).unwrap();
        assert_eq!(r.index, 3);
        assert_eq!(r.temperature_gpu, 71);
        assert_eq!(r.power_draw, 0);
        assert_eq!(r.memory_free, 0);
    }
}
