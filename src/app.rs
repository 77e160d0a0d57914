//! rxchain-bench application.
//!
//! This module contains a top-level structure [`App`] that represents the
//! whole rxchain-bench application. It opens the link to the SoC, runs the
//! requested tests and writes the session report.

use crate::{
    args::{Args, Command},
    bench,
    bus::{AhbBus, Link},
    config::BenchConfig,
    console::Console,
    report::Session,
    serial,
    sim::{self, SimOptions},
    soc::Soc,
};
use anyhow::{Context, Result};
use rxchain_json::TestResult;
use std::path::PathBuf;

/// SoC driver over a boxed link.
pub type LinkSoc = Soc<Box<dyn Link>>;

const MENU: &str = "
--- rxchain Test Menu ---
1. Test RAM
2. Test Filter Chain
3. Test AES
4. Run Power Analysis Comparison
5. Exit
";

/// rxchain-bench application.
///
/// This struct owns the SoC driver, the configuration and the session that
/// collects the test results.
#[derive(Debug)]
pub struct App {
    soc: Option<LinkSoc>,
    config: BenchConfig,
    command: Command,
    session: Session,
    report: Option<PathBuf>,
}

impl App {
    /// Creates a new application.
    ///
    /// The configuration file is loaded and overridden by the CLI arguments.
    /// The link to the SoC is only opened if the command needs it.
    #[tracing::instrument(name = "App::new", level = "debug")]
    pub async fn new(args: &Args) -> Result<App> {
        let mut config = match &args.config {
            Some(path) => BenchConfig::load(path).await?,
            None => BenchConfig::default(),
        };
        if let Some(policy) = args.policy {
            config.policy = policy;
        }
        if let Some(slicer) = args.dfe_slicer {
            config.chain.dfe_slicer = slicer;
        }
        let command = args.command.clone().unwrap_or(Command::Menu);
        if let Command::Power {
            duration: Some(duration),
        } = command
        {
            config.power_duration_s = f64::from(duration);
        }
        config.validate()?;

        let (soc, link) = if command.needs_link() {
            let (link, description) = open_link(args, &config).await?;
            let bus = AhbBus::new(link, config.response_timeout());
            (Some(Soc::new(bus, config.map)), description)
        } else {
            (None, "none".to_string())
        };
        let session = Session::new(&link, &config.chain);

        Ok(App {
            soc,
            config,
            command,
            session,
            report: args.report.clone(),
        })
    }

    /// Runs the application.
    ///
    /// Outside the interactive menu, an error is returned if any check
    /// failed.
    #[tracing::instrument(name = "App::run", level = "debug", skip_all)]
    pub async fn run(mut self) -> Result<()> {
        match self.command.clone() {
            Command::Menu => self.menu(&mut Console::stdio()).await?,
            Command::Ram => self.ram().await?,
            Command::Filter => self.filter().await?,
            Command::Aes => self.aes().await?,
            Command::Power { .. } => self.power(None).await?,
            Command::All => {
                self.ram().await?;
                self.filter().await?;
                self.aes().await?;
            }
            Command::Golden { samples } => {
                let samples = if samples.is_empty() {
                    self.config.filter_samples.clone()
                } else {
                    samples
                };
                self.session
                    .record(TestResult::Golden(bench::golden::run(&self.config.chain, &samples)));
            }
        }
        self.finish().await
    }

    async fn finish(self) -> Result<()> {
        if let Some(soc) = &self.soc {
            let stats = soc.bus_stats();
            tracing::info!(
                "bus transactions: {} writes, {} reads, {} failed",
                stats.writes,
                stats.reads,
                stats.errors
            );
        }
        self.session.log_summary();
        if let Some(path) = &self.report {
            self.session.write(path).await?;
        }
        let summary = self.session.summary();
        if self.command != Command::Menu && !summary.all_passed() {
            anyhow::bail!("{} checks failed", summary.failed);
        }
        Ok(())
    }

    /// Runs the interactive test menu until the operator exits.
    pub async fn menu(&mut self, console: &mut Console) -> Result<()> {
        loop {
            console.print(MENU).await?;
            let Some(choice) = console.prompt("Select: ").await? else {
                return Ok(());
            };
            match choice.as_str() {
                "1" => self.ram().await?,
                "2" => self.filter().await?,
                "3" => self.aes().await?,
                "4" => self.power(Some(&mut *console)).await?,
                "5" => return Ok(()),
                _ => console.print("Invalid choice.\n").await?,
            }
        }
    }

    async fn ram(&mut self) -> Result<()> {
        let result = bench::ram::run(soc(&mut self.soc)?).await;
        self.session.record(TestResult::Ram(result));
        Ok(())
    }

    async fn filter(&mut self) -> Result<()> {
        let result = bench::filter::run(soc(&mut self.soc)?, &self.config).await;
        self.session.record(TestResult::Filter(result));
        Ok(())
    }

    async fn aes(&mut self) -> Result<()> {
        let result = bench::aes::run(soc(&mut self.soc)?, &self.config).await;
        self.session.record(TestResult::Aes(result));
        Ok(())
    }

    async fn power(&mut self, console: Option<&mut Console>) -> Result<()> {
        let result = bench::power::run(soc(&mut self.soc)?, &self.config, console).await;
        self.session.record(TestResult::Power(result));
        Ok(())
    }

    /// Returns the session collecting the test results.
    pub fn session(&self) -> &Session {
        &self.session
    }
}

fn soc(soc: &mut Option<LinkSoc>) -> Result<&mut LinkSoc> {
    soc.as_mut().context("no link to the SoC")
}

// Opens the link selected in the arguments and returns it together with its
// description.
async fn open_link(args: &Args, config: &BenchConfig) -> Result<(Box<dyn Link>, String)> {
    if args.simulate {
        let mut options = SimOptions {
            map: config.map,
            chain: config.chain,
            ..Default::default()
        };
        let description = match args.simulate_defect {
            Some(defect) => {
                options = options.with_defect(defect);
                format!("simulated SoC ({defect})")
            }
            None => "simulated SoC".to_string(),
        };
        tracing::info!("using {description}");
        let link: Box<dyn Link> = Box::new(sim::spawn(options));
        return Ok((link, description));
    }
    let target = args
        .link_target()
        .context("no link given (use --port, --tcp or --simulate)")?;
    Ok((serial::open(&target).await?, target.to_string()))
}
