//! Check system capabilities.

use flyover_common::AppConfig;
use flyover_render_engine::ffmpeg_available;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Flyover System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg_ok = ffmpeg_available();
    if ffmpeg_ok {
        println!("[OK] ffmpeg found on PATH");
    } else {
        println!("[FAIL] ffmpeg not found on PATH (required for `flyover render`)");
    }

    let config_path = AppConfig::path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: {} (not created, using defaults)", config_path.display());
    }
    println!("[INFO] Output directory: {}", config.output_dir.display());
    println!(
        "[INFO] Default render: {}x{} @ {}fps, style '{}'",
        config.render.width, config.render.height, config.render.fps, config.render.map_style
    );

    println!();
    if ffmpeg_ok {
        println!("All required capabilities are available. Flyover is ready.");
    } else {
        println!("Some required capabilities are missing. Install ffmpeg to render videos.");
    }

    Ok(())
}
