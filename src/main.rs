use actix_web::{App, HttpServer, middleware::Logger, web};
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use chrono::Local;  // timestamp in log lines
use std::sync::Arc;

use lottery_rewards::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::create_cors,
    services::*,
    swagger::swagger_config,
    tasks,
    utils::{CountCache, RewardCalendar, SystemClock, UniformDraw},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let calendar = RewardCalendar::from_config(&config.rewards, Arc::new(SystemClock))
        .expect("Invalid reward calendar settings");
    let counts = CountCache::default();

    // 创建服务
    let reward_engine = RewardEngine::new(
        pool.clone(),
        &config.rewards,
        calendar.clone(),
        Arc::new(UniformDraw),
        counts.clone(),
    );
    let account_service = AccountService::new(pool.clone());
    let admin_service = AdminService::new(
        pool.clone(),
        &config.rewards,
        config.retention.clone(),
        calendar,
        counts,
    );

    // 启动后台定时任务
    tasks::spawn_all(admin_service.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{} (cutoff {} at UTC{:+} min)",
        config.server.host,
        config.server.port,
        config.rewards.cutoff,
        config.rewards.utc_offset_minutes
    );

    let admin_token = config.admin.token.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(reward_engine.clone()))
            .app_data(web::Data::new(account_service.clone()))
            .app_data(web::Data::new(admin_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::reward_config)
                    .configure(handlers::admin_config(admin_token.clone())),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
