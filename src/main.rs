use clap::Parser;
use paper_video::api::QwenClient;
use paper_video::error::Result;
use paper_video::scene::{ScriptConfig, ScriptVersion};
use paper_video::script::{build_version, export_approved, regenerate_partial, ScriptEngine};
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "paper-video")]
#[command(about = "Turn a research document into a narrated-video script using AI", long_about = None)]
struct Args {
    /// Input document text
    #[arg(short, long)]
    text: Option<String>,

    /// Input document file path
    #[arg(short, long)]
    file: Option<String>,

    /// Working directory for script state
    #[arg(short = 'w', long, default_value = "./output")]
    work_dir: String,

    /// Number of scenes per script
    #[arg(long, default_value_t = 15)]
    scenes: usize,

    /// Seconds per scene slot
    #[arg(long, default_value_t = 6.0)]
    slot_seconds: f64,

    /// Number of independent script variants to request
    #[arg(long, default_value_t = 1)]
    variants: usize,

    /// Mark a scene approved before anything else (1-based, repeatable)
    #[arg(long)]
    approve: Vec<usize>,

    /// Clear a scene's approval (1-based, repeatable)
    #[arg(long)]
    unapprove: Vec<usize>,

    /// Write the approved-export projection and exit
    #[arg(long)]
    export: bool,

    /// DashScope API key
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    // 加载环境变量
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Script generation failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = ScriptConfig::new(args.scenes, args.slot_seconds);
    let script_path = Path::new(&args.work_dir).join("script.json");

    // 审批状态先落盘，再决定是否重新生成或导出
    if !args.approve.is_empty() || !args.unapprove.is_empty() {
        let mut version = load_script(&script_path)?;
        apply_approvals(&mut version, &args.approve, true);
        apply_approvals(&mut version, &args.unapprove, false);
        save_json(&script_path, &version).await?;
        info!(
            "Updated approvals: {}/{} scenes approved",
            version.scenes.iter().filter(|s| s.approved).count(),
            version.scenes.len()
        );
    }

    if args.export {
        let version = load_script(&script_path)?;
        let projection = export_approved(&version);
        let export_path = Path::new(&args.work_dir).join("export.json");
        save_json(&export_path, &projection).await?;
        info!(
            "Export written to {} (status: {:?})",
            export_path.display(),
            projection.status
        );
        println!("{}", projection.final_text);
        return Ok(());
    }

    // 没有输入文本就只是审批操作，到此为止
    let Some(input_text) = input_text(&args).await? else {
        if args.approve.is_empty() && args.unapprove.is_empty() {
            eprintln!("Error: Either --text or --file must be provided");
            std::process::exit(1);
        }
        return Ok(());
    };

    let api_key = if let Some(key) = args.api_key {
        key
    } else if let Ok(key) = std::env::var("DASHSCOPE_API_KEY") {
        key
    } else {
        eprintln!("Error: DASHSCOPE_API_KEY not found. Please set it via --api-key or DASHSCOPE_API_KEY environment variable");
        std::process::exit(1);
    };

    info!("Input text length: {} characters", input_text.len());
    tokio::fs::create_dir_all(&args.work_dir).await?;

    let client = QwenClient::new(api_key);
    let engine = ScriptEngine::new(config);

    if script_path.exists() {
        regenerate(&client, &engine, &input_text, &script_path, args.variants).await
    } else {
        generate_initial(
            &client,
            &engine,
            &input_text,
            &args.work_dir,
            &script_path,
            args.variants,
        )
        .await
    }
}

/// 首次生成：支持多变体，变体 1 同时作为当前脚本
async fn generate_initial(
    client: &QwenClient,
    engine: &ScriptEngine,
    input_text: &str,
    work_dir: &str,
    script_path: &Path,
    variants: usize,
) -> Result<()> {
    info!("Step 1/2: Generating narration script...");
    let versions = if variants > 1 {
        let raw = client
            .generate_script_variants(input_text, engine.config(), variants)
            .await?;
        engine
            .build_scene_variants(&raw, variants)?
            .into_iter()
            .map(build_version)
            .collect::<Vec<_>>()
    } else {
        let raw = client.generate_script(input_text, engine.config()).await?;
        vec![build_version(engine.build_scenes(&raw)?)]
    };

    info!("Step 2/2: Writing {} script version(s)...", versions.len());
    for (i, version) in versions.iter().enumerate().skip(1) {
        let path = Path::new(work_dir).join(format!("script_variant_{}.json", i + 1));
        save_json(&path, version).await?;
    }
    save_json(script_path, &versions[0]).await?;

    info!(
        "Generated script with {} scenes (version {})",
        versions[0].scenes.len(),
        versions[0].version
    );
    Ok(())
}

/// 已有脚本：重新生成未审批的场景，已审批的原样保留
async fn regenerate(
    client: &QwenClient,
    engine: &ScriptEngine,
    input_text: &str,
    script_path: &Path,
    variants: usize,
) -> Result<()> {
    if variants > 1 {
        warn!("--variants is only honored on initial generation, requesting a single script");
    }

    let current = load_script(script_path)?;
    info!(
        "Found existing script (version {}), regenerating unapproved scenes...",
        current.version
    );

    let raw = client.generate_script(input_text, engine.config()).await?;
    let fresh = engine.build_scenes(&raw)?;
    let next = regenerate_partial(&current, &fresh)?;

    if next.version == current.version {
        info!("All scenes approved, nothing to regenerate");
        return Ok(());
    }

    save_json(script_path, &next).await?;
    info!(
        "Script regenerated (version {} -> {})",
        current.version, next.version
    );
    Ok(())
}

async fn input_text(args: &Args) -> Result<Option<String>> {
    if let Some(text) = &args.text {
        return Ok(Some(text.clone()));
    }
    if let Some(file_path) = &args.file {
        let text = tokio::fs::read_to_string(file_path).await?;
        return Ok(Some(text));
    }
    Ok(None)
}

fn apply_approvals(version: &mut ScriptVersion, indices: &[usize], approved: bool) {
    for &number in indices {
        match number.checked_sub(1).and_then(|i| version.scenes.get_mut(i)) {
            Some(scene) => scene.approved = approved,
            None => warn!("Scene {} does not exist, ignoring", number),
        }
    }
}

fn load_script(path: &Path) -> Result<ScriptVersion> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

async fn save_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, data).await?;
    Ok(())
}
