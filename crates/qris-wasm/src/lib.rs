//! WASM bindings для генератора QRIS
//!
//! Предоставляет JavaScript API для checkout: генерация динамического
//! QRIS, проверки и отрисовка в SVG.

use qris_core::{DynamicQris, GeneratorConfig, QrisPayload, RenderOptions};
use wasm_bindgen::prelude::*;

/// Инициализация panic hook и логирования в консоль
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("QRIS WASM module initialized");
}

/// JavaScript-доступный генератор
#[wasm_bindgen]
pub struct WasmQrisGenerator {
    generator: DynamicQris,
}

#[wasm_bindgen]
impl WasmQrisGenerator {
    /// Генератор с настройками по умолчанию
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            generator: DynamicQris::new(),
        }
    }

    /// Генератор с пользовательскими настройками
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(verify_input_checksum: bool, allow_merchant_name_anchor: bool) -> Self {
        Self {
            generator: DynamicQris::with_config(GeneratorConfig {
                verify_input_checksum,
                allow_merchant_name_anchor,
            }),
        }
    }

    /// Динамический QRIS из статического
    ///
    /// @param static_payload - статический QRIS мерчанта (из базы)
    /// @param amount - сумма в рупиях, целое число
    /// @returns строка динамического QRIS
    #[wasm_bindgen(js_name = generate)]
    pub fn generate(&self, static_payload: &str, amount: f64) -> Result<String, JsError> {
        let amount = js_amount(amount)?;
        self.generator
            .generate(static_payload, amount)
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmQrisGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// JS числа приходят как f64; дробные суммы отклоняем, а не округляем.
fn js_amount(amount: f64) -> Result<i64, JsError> {
    if !amount.is_finite() || amount.fract() != 0.0 {
        return Err(JsError::new(&format!("Amount must be a whole number of Rupiah, got {}", amount)));
    }
    Ok(amount as i64)
}

/// Генерация с настройками по умолчанию
#[wasm_bindgen(js_name = generateDynamicPayload)]
pub fn generate_dynamic_payload(static_payload: &str, amount: f64) -> Result<String, JsError> {
    WasmQrisGenerator::new().generate(static_payload, amount)
}

#[wasm_bindgen(js_name = isValidPayload)]
pub fn is_valid_payload(payload: &str) -> bool {
    qris_core::is_valid_payload(payload)
}

/// Сумма из тега 54 или null
#[wasm_bindgen(js_name = extractAmount)]
pub fn extract_amount(payload: &str) -> Option<f64> {
    qris_core::extract_amount(payload).map(|a| a as f64)
}

#[wasm_bindgen(js_name = computeChecksum)]
pub fn compute_checksum(data: &str) -> String {
    qris_core::compute_checksum(data)
}

/// Сравнение статического и динамического QRIS (только для отладки)
#[wasm_bindgen(js_name = compareChecksums)]
pub fn compare_checksums(original: &str, dynamic: &str) -> Result<JsValue, JsError> {
    let report = qris_core::compare_checksums(original, dynamic);
    serde_wasm_bindgen::to_value(&report).map_err(|e| JsError::new(&e.to_string()))
}

/// Полный разбор payload с проверкой CRC
#[wasm_bindgen(js_name = inspectPayload)]
pub fn inspect_payload(payload: &str) -> Result<JsValue, JsError> {
    let parsed = QrisPayload::parse(payload).map_err(|e| JsError::new(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&parsed).map_err(|e| JsError::new(&e.to_string()))
}

/// "Rp 15.000"
#[wasm_bindgen(js_name = formatRupiah)]
pub fn format_rupiah(amount: f64) -> String {
    qris_core::format_rupiah(amount.trunc() as i64)
}

/// SVG для отображения покупателю. Payload с неверным CRC не отрисовывается.
#[wasm_bindgen(js_name = renderSvg)]
pub fn render_svg(payload: &str, size: u32) -> Result<String, JsError> {
    let options = RenderOptions {
        size,
        ..RenderOptions::svg()
    };
    let bytes = qris_core::render(payload, &options).map_err(|e| JsError::new(&e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| JsError::new(&e.to_string()))
}

/// Информация о версии
#[wasm_bindgen(js_name = version)]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
