//! Codificação dos registros em JSON Lines.
//!
//! Um [`GpuRecord`] vira exatamente UMA linha no stdout:
//!
//! ```text
//! {"index":0,"utilization.gpu":97,...}\n
//! ```
//!
//! Sem framing, sem compressão: o consumidor lê linha a linha e faz o
//! parse de cada objeto isoladamente. A ordem das chaves segue a
//! declaração do struct (`index` primeiro, contadores ECC por último).

use crate::types::GpuRecord;

/// Versão do esquema de registro emitido.
pub const FORMAT_VERSION: u8 = 1;

/// Erros de codificação/decodificação de registros.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Codifica um [`GpuRecord`] como um objeto JSON compacto de linha única.
///
/// A string retornada não contém `\n`; o chamador decide o terminador.
pub fn encode_record(record: &GpuRecord) -> Result<String, RecordError> {
    serde_json::to_string(record).map_err(|e| RecordError::Serialize(e.to_string()))
}

/// Decodifica uma linha JSON em [`GpuRecord`].
///
/// Chaves ausentes assumem zero; chaves desconhecidas são ignoradas.
pub fn decode_record(line: &str) -> Result<GpuRecord, RecordError> {
    serde_json::from_str(line.trim_end()).map_err(|e| RecordError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> GpuRecord {
        GpuRecord {
            index: 0,
            utilization_gpu: 93,
            utilization_memory: 41,
            memory_total: 25_757_220_864,
            memory_free: 1_610_612_736,
            memory_used: 24_146_608_128,
            temperature_gpu: 74,
            temperature_memory: 66,
            pstate: 0,
            power_draw: 312_450,
            enforced_power_limit: 350_000,
            clocks_current_sm: 1_860,
            clocks_throttle_reasons_active: 0x0000_0000_0000_0004,
            ecc_errors_uncorrected_total: 0,
            ecc_errors_corrected_total: 12,
        }
    }

    #[test]
    fn encode_is_single_line() {
        let line = encode_record(&sample_record()).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.starts_with(r#"{"index":0,"#));
        assert!(line.ends_with('}'));
    }

    #[test]
    fn key_order_follows_struct_declaration() {
        let line = encode_record(&sample_record()).unwrap();
        let idx_pos = line.find(r#""index""#).unwrap();
        let util_pos = line.find(r#""utilization.gpu""#).unwrap();
        let ecc_pos = line.find(r#""ecc.errors.corrected.aggregate.total""#).unwrap();
        assert!(idx_pos < util_pos);
        assert!(util_pos < ecc_pos);
    }

    #[test]
    fn decode_accepts_trailing_newline() {
        let mut line = encode_record(&sample_record()).unwrap();
        line.push('\n');
        let decoded = decode_record(&line).unwrap();
        assert_eq!(decoded, sample_record());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_record("not json at all"),
            Err(RecordError::Deserialize(_))
        ));
    }

    #[test]
    fn large_counters_survive_encoding() {
        let record = GpuRecord {
            clocks_throttle_reasons_active: u64::MAX,
            ecc_errors_corrected_total: u64::MAX - 1,
            ..Default::default()
        };
        let decoded = decode_record(&encode_record(&record).unwrap()).unwrap();
        assert_eq!(decoded.clocks_throttle_reasons_active, u64::MAX);
        assert_eq!(decoded.ecc_errors_corrected_total, u64::MAX - 1);
    }
}
