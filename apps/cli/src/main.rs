use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use gemini_relay_core_sdk::{
    config::{RelayConfig, DEFAULT_ADDR, DEFAULT_API_BASE},
    error::MISSING_API_KEY,
    llm::GeminiClient,
    server,
};

/**
 * \brief CLI 程序入口：启动中继服务或直接调用 Gemini。
 */
#[derive(Parser, Debug)]
#[command(name = "gemini-relay", version, about = "Gemini chat relay")]
struct Cli {
    /** \brief 打开 debug 级别日志 */
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief 启动 HTTP 中继服务并提供前端页面。
     */
    Serve {
        #[arg(long, env = "GEMINI_RELAY_ADDR", default_value = DEFAULT_ADDR)]
        addr: String,
        /** \brief 在 `/` 提供的静态前端目录 */
        #[arg(long)]
        static_dir: Option<String>,
        #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
        api_base: String,
        /** \brief 请求未指定模型时使用的模型 */
        #[arg(long)]
        default_model: Option<String>,
        /** \brief 允许的跨域来源，可重复；省略时回显任意来源 */
        #[arg(long = "cors-origin")]
        cors_origins: Vec<String>,
        /** \brief 将请求事件追加写入 logs/gemini-relay.log */
        #[arg(long, default_value_t = false)]
        telemetry: bool,
    },

    /**
     * \brief 发送一条消息并打印模型回复。
     */
    Chat {
        #[command(flatten)]
        upstream: Upstream,
        #[arg(long)]
        message: String,
        #[arg(long)]
        model: Option<String>,
    },

    /**
     * \brief 列出支持 generateContent 的模型。
     */
    Models {
        #[command(flatten)]
        upstream: Upstream,
    },
}

/**
 * \brief 直接调用 Gemini 的子命令共用的密钥与基地址参数。
 */
#[derive(Args, Debug)]
struct Upstream {
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,
}

impl Upstream {
    fn client(&self) -> Result<GeminiClient> {
        if self.api_key.is_empty() {
            bail!(MISSING_API_KEY);
        }
        GeminiClient::new(&self.api_base, &self.api_key).context("build gemini client failed")
    }
}

/**
 * \brief chat 子命令使用的模型：未指定时回落到默认模型。
 */
fn chat_model(requested: Option<&str>) -> String {
    RelayConfig::default().resolve_model(requested).to_string()
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "gemini_relay_core_sdk=debug,gemini_relay=debug,tower_http=debug"
    } else {
        "gemini_relay_core_sdk=info,gemini_relay=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve {
            addr,
            static_dir,
            api_base,
            default_model,
            cors_origins,
            telemetry,
        } => {
            let mut config = RelayConfig {
                addr,
                api_base,
                cors_origins,
                telemetry,
                ..RelayConfig::default()
            };
            if let Some(dir) = static_dir {
                config.static_dir = dir;
            }
            if let Some(model) = default_model {
                config.default_model = model;
            }
            tracing::info!(
                static_dir = %config.static_dir,
                default_model = %config.default_model,
                "starting gemini-relay v{}",
                env!("CARGO_PKG_VERSION")
            );
            server::run(config).await?;
        }
        Commands::Chat {
            upstream,
            message,
            model,
        } => {
            let model = chat_model(model.as_deref());
            let reply = upstream
                .client()?
                .generate(&model, &message)
                .await
                .context("chat failed")?;
            println!("{}", reply);
        }
        Commands::Models { upstream } => {
            let models = upstream
                .client()?
                .list_models()
                .await
                .context("list models failed")?;
            for name in models {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
