//! Отрисовка QRIS в изображение
//!
//! Payload с неверной контрольной суммой не отрисовывается: такой код
//! сканируется как "QR", но банковское приложение его отклонит.

use image::Luma;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::payload::verify_checksum;
use crate::QrisError;

/// Формат вывода
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderFormat {
    /// PNG (байты файла)
    Png,
    /// SVG (UTF-8 строка)
    Svg,
    /// Unicode для терминала
    Terminal,
}

/// Параметры отрисовки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Минимальный размер стороны в пикселях (PNG, SVG)
    pub size: u32,
    /// Добавлять тихую зону вокруг кода
    pub quiet_zone: bool,
    pub format: RenderFormat,
    /// Цвет модулей, например "#000000"
    pub dark_color: String,
    /// Цвет фона
    pub light_color: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: 320,
            quiet_zone: true,
            format: RenderFormat::Png,
            dark_color: "#000000".to_string(),
            light_color: "#FFFFFF".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn png(size: u32) -> Self {
        Self {
            size,
            format: RenderFormat::Png,
            ..Self::default()
        }
    }

    pub fn svg() -> Self {
        Self {
            format: RenderFormat::Svg,
            ..Self::default()
        }
    }

    pub fn terminal() -> Self {
        Self {
            format: RenderFormat::Terminal,
            ..Self::default()
        }
    }
}

/// Отрисовка payload. Контрольная сумма проверяется до кодирования.
pub fn render(payload: &str, options: &RenderOptions) -> Result<Vec<u8>, QrisError> {
    verify_checksum(payload)?;

    // QRIS требует уровень коррекции не ниже M
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| QrisError::Render(format!("QR encoding failed: {}", e)))?;
    log::debug!("QR version {:?} for {} bytes", code.version(), payload.len());

    match options.format {
        RenderFormat::Png => render_png(&code, options),
        RenderFormat::Svg => Ok(render_svg(&code, options).into_bytes()),
        RenderFormat::Terminal => Ok(render_terminal(&code).into_bytes()),
    }
}

fn render_png(code: &QrCode, options: &RenderOptions) -> Result<Vec<u8>, QrisError> {
    let img = code
        .render::<Luma<u8>>()
        .quiet_zone(options.quiet_zone)
        .min_dimensions(options.size, options.size)
        .build();

    let mut bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut bytes);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::L8,
    )
    .map_err(|e| QrisError::Render(format!("PNG encoding failed: {}", e)))?;

    Ok(bytes)
}

fn render_svg(code: &QrCode, options: &RenderOptions) -> String {
    code.render::<svg::Color<'_>>()
        .quiet_zone(options.quiet_zone)
        .min_dimensions(options.size, options.size)
        .dark_color(svg::Color(&options.dark_color))
        .light_color(svg::Color(&options.light_color))
        .build()
}

fn render_terminal(code: &QrCode) -> String {
    code.render::<char>()
        .quiet_zone(true)
        .module_dimensions(2, 1)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DYNAMIC_15000: &str = "00020101021126630016ID.CO.SHOPEE.WWW0118936009151234567890021054031234560303UME51440014ID.CO.QRIS.WWW0215ID10200000123450303UME5204581253033605405150005802ID5919TOKO KOPI 5405 JAYA6013JAKARTA PUSAT61051011062120708K54-TOKO6304BB2F";

    #[test]
    fn test_render_formats() {
        let png = render(DYNAMIC_15000, &RenderOptions::png(256)).unwrap();
        assert!(png.starts_with(&[0x89, 0x50, 0x4E, 0x47]));

        let svg = String::from_utf8(render(DYNAMIC_15000, &RenderOptions::svg()).unwrap()).unwrap();
        assert!(svg.contains("<svg"));

        let term = render(DYNAMIC_15000, &RenderOptions::terminal()).unwrap();
        assert!(!term.is_empty());
    }

    #[test]
    fn test_refuses_bad_checksum() {
        let broken = DYNAMIC_15000.replace("6304BB2F", "6304BB2E");
        let err = render(&broken, &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, QrisError::ChecksumMismatch { .. }));
    }
}
