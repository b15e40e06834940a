use anyhow::{Context, Result};
use std::sync::Arc;

use reedline::{DefaultCompleter, DefaultHinter, DefaultPrompt, Reedline, Signal};

use crate::agent::PrintObserver;
use crate::backend::BackendClient;
use crate::chat::ChatService;
use crate::config::Config;
use crate::server;

/// 打印帮助信息
fn print_help() {
    println!("🤖 brk - 门店导购助手");
    println!();
    println!("用法：brk <命令>");
    println!();
    println!("命令:");
    println!("  chat                      进入交互模式");
    println!("  serve                     启动 HTTP 聊天服务");
    println!("  tools                     查看可用工具");
    println!("  fetch stores              直接查询门店列表");
    println!("  fetch assortment [分类]   直接查询商品");
    println!("  onboard                   初始化配置");
    println!("  help                      显示此帮助信息");
    println!();
    println!("交互模式命令:");
    println!("  /clear  - 清空当前会话历史");
    println!("  /new    - 开始新会话");
    println!("  /quit   - 退出");
    println!();
    println!("环境变量（也可写在当前目录的 .env 中）:");
    println!("  API_URL, AUTH_USERNAME, AUTH_PASSWORD, OPENAI_KEY");
}

fn print_repl_help() {
    println!("命令:");
    println!("  /clear  - 清空当前会话历史");
    println!("  /new    - 开始新会话");
    println!("  /quit   - 退出");
    println!();
}

/// Onboard 命令 - 写出默认配置文件
fn run_onboard() -> Result<()> {
    println!("🚀 初始化 brk 配置...\n");

    let config_path = Config::default_path();
    Config::default()
        .save(&config_path)
        .context("保存配置文件失败")?;
    println!("✅ 保存配置：{}", config_path.display());
    println!();
    println!("接下来:");
    println!("  1. 在环境变量或 .env 中设置 API_URL / AUTH_USERNAME / AUTH_PASSWORD / OPENAI_KEY");
    println!("  2. 运行 'brk chat' 开始对话，或 'brk serve' 启动 HTTP 服务");

    Ok(())
}

/// Tools 命令 - 列出工具描述
fn run_tools(config: &Config) -> Result<()> {
    let service = ChatService::from_config(config);

    for tool in service.tools().tools() {
        println!("🔧 {} ({})", tool.title(), tool.name());
        println!("   {}", tool.description());
        if let Some(schema) = tool.parameters_schema() {
            println!("   参数：{}", schema);
        }
        println!();
    }

    Ok(())
}

/// Fetch 命令 - 绕过 agent 直接查询后端
async fn run_fetch(config: &Config, args: &[String]) -> Result<()> {
    let client = BackendClient::new(Arc::new(config.backend.clone()));

    let target = args.first().map(|s| s.to_lowercase()).unwrap_or_default();
    let output = match target.as_str() {
        "stores" | "store" => serde_json::to_string_pretty(&client.fetch_stores().await?)?,
        "assortment" => {
            let pathname = args.get(1).map(String::as_str);
            serde_json::to_string_pretty(&client.fetch_assortment(pathname).await?)?
        }
        _ => {
            eprintln!("❌ 请指定查询对象");
            eprintln!("用法：brk fetch stores | brk fetch assortment [分类]");
            std::process::exit(1);
        }
    };

    println!("{}", output);
    Ok(())
}

/// Serve 命令 - HTTP 聊天服务
async fn run_serve(config: &Config) -> Result<()> {
    let service = Arc::new(ChatService::from_config(config));
    println!("🌐 监听 http://{}:{}", config.server.host, config.server.port);
    server::serve(service, &config.server).await
}

/// Chat 命令 - 交互式对话
async fn run_chat(config: &Config) -> Result<()> {
    println!("🤖 门店导购助手");
    println!("可用工具：get_assortment, get_stores");
    println!("输入 /quit 退出，输入 /help 查看帮助\n");

    println!("🤖 模型：{}", config.agent.model);
    println!(
        "🧠 记忆：{}",
        if config.agent.enable_memory { "开启" } else { "关闭" }
    );
    println!();

    let service = ChatService::from_config(config);
    let mut session_id = service.on_session_start();
    println!("📝 当前会话：{}\n", session_id);

    // 使用 reedline 处理输入，支持 UTF-8 和行编辑
    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(DefaultHinter::default()))
        .with_completer(Box::new(DefaultCompleter::default()));
    let prompt = DefaultPrompt::default();

    loop {
        let sig = line_editor.read_line(&prompt)?;

        match sig {
            Signal::Success(buffer) => {
                let input = buffer.trim();

                if input.is_empty() {
                    continue;
                }

                // 斜杠命令
                if input.starts_with('/') {
                    let cmd = input
                        .split_whitespace()
                        .next()
                        .map(|s| s.to_lowercase())
                        .unwrap_or_default();

                    match cmd.as_str() {
                        "/quit" | "/exit" => {
                            println!("👋 再见！");
                            break;
                        }
                        "/clear" => {
                            service.clear_history(&session_id).await?;
                            println!("✅ 已清空当前会话历史\n");
                        }
                        "/new" => {
                            service.end_session(&session_id);
                            session_id = service.on_session_start();
                            println!("✅ 已创建新会话：{}\n", session_id);
                        }
                        "/help" | "/h" => print_repl_help(),
                        _ => {
                            println!("❌ 未知命令：{}", input);
                            println!("输入 /help 查看帮助\n");
                        }
                    }
                    continue;
                }

                match service.on_message(&session_id, input, &PrintObserver).await {
                    Ok(reply) => {
                        println!("🤖 AI: {}\n", reply);
                    }
                    Err(e) => {
                        println!("❌ 错误：{:#}\n", e);
                    }
                }
            }
            Signal::CtrlD => {
                println!("\n👋 再见！");
                break;
            }
            Signal::CtrlC => {
                println!("\n输入 /quit 退出，或继续输入问题");
            }
        }
    }

    service.end_session(&session_id);
    Ok(())
}

/// 主入口函数
pub async fn run_cli() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    let command = args[1].to_lowercase();

    match command.as_str() {
        "chat" | "c" => run_chat(&Config::load_default()?).await,
        "serve" => run_serve(&Config::load_default()?).await,
        "tools" => run_tools(&Config::load_default()?),
        "fetch" => run_fetch(&Config::load_default()?, &args[2..]).await,
        "onboard" => run_onboard(),
        "help" | "-h" | "--help" | "h" => {
            print_help();
            Ok(())
        }
        _ => {
            eprintln!("❌ 未知命令：{}", command);
            eprintln!();
            eprintln!("运行 'brk help' 查看帮助信息");
            std::process::exit(1);
        }
    }
}
