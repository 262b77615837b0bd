//! Backend availability check.

use console::style;

use earnings_ocr::config::Config;
use earnings_ocr::ocr::{OcrBackend, OcrBackendType, TesseractBackend};

/// Report which OCR backends can run on this machine.
pub async fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let backend_config = config.ocr.backend_config();

    println!("\n{}", style("OCR Backend Status").bold());
    println!("{}", "-".repeat(50));

    let tesseract = TesseractBackend::with_config(backend_config.clone());
    print_status(
        "Tesseract",
        tesseract.is_available(),
        &tesseract.availability_hint(),
        config.ocr.backend == OcrBackendType::Tesseract,
    );

    #[cfg(feature = "ocr-ocrs")]
    {
        use earnings_ocr::ocr::OcrsBackend;
        let ocrs = OcrsBackend::with_config(backend_config);
        print_status(
            "OCRS",
            ocrs.is_available(),
            &ocrs.availability_hint(),
            config.ocr.backend == OcrBackendType::Ocrs,
        );
    }
    #[cfg(not(feature = "ocr-ocrs"))]
    {
        let _ = backend_config;
        println!(
            "  {:<15} {}",
            "OCRS",
            style("not compiled (enable ocr-ocrs feature)").dim()
        );
    }

    println!();
    println!(
        "  {:<15} {}",
        "Language",
        style(&config.ocr.language).cyan()
    );
    println!(
        "  {:<15} {}",
        "On error",
        style(config.pipeline.on_error.as_str()).cyan()
    );
    println!();

    Ok(())
}

fn print_status(name: &str, available: bool, hint: &str, selected: bool) {
    let status = if available {
        style("✓ available").green()
    } else {
        style("✗ not available").red()
    };
    let marker = if selected { " (selected)" } else { "" };
    println!("  {:<15} {}{}", name, status, style(marker).bold());
    if !available || selected {
        println!("                  {}", style(hint).dim());
    }
}
