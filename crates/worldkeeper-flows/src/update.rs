use worldkeeper_core::{RunConfiguration, UpdateError};
use worldkeeper_service::{
    ChannelConnector, DependencyInstaller, EnvironmentVerifier, InstallOutcome, SourceSync,
    SyncOutcome, VerifiedEnvironment,
};

use crate::LogSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub sync: SyncOutcome,
    pub environment: VerifiedEnvironment,
    pub install: InstallOutcome,
}

/// sync → verify → install → restart, each step a hard gate.
pub struct UpdateOrchestrator<'a> {
    config: &'a RunConfiguration,
    verifier: &'a dyn EnvironmentVerifier,
    sync: &'a mut dyn SourceSync,
    installer: &'a mut dyn DependencyInstaller,
    connector: &'a mut dyn ChannelConnector,
}

impl<'a> UpdateOrchestrator<'a> {
    pub fn new(
        config: &'a RunConfiguration,
        verifier: &'a dyn EnvironmentVerifier,
        sync: &'a mut dyn SourceSync,
        installer: &'a mut dyn DependencyInstaller,
        connector: &'a mut dyn ChannelConnector,
    ) -> Self {
        Self {
            config,
            verifier,
            sync,
            installer,
            connector,
        }
    }

    pub fn run(&mut self, log: &mut LogSink) -> Result<UpdateReport, UpdateError> {
        log.info(format!(
            "update: starting in {}",
            self.config.working_dir.display()
        ));
        let result = self.run_steps(log);
        match &result {
            Ok(_) => log.info("update: complete"),
            Err(err) => {
                log.error(format!("update: {} failed: {err}", err.step()));
                log.error(format!(
                    "update: aborted at step {} (reason={})",
                    err.step(),
                    err.reason_code()
                ));
            }
        }
        result
    }

    fn run_steps(&mut self, log: &mut LogSink) -> Result<UpdateReport, UpdateError> {
        log.info("update: sync: pulling latest source");
        let sync = self
            .sync
            .sync(&self.config.working_dir)
            .map_err(UpdateError::SyncFailed)?;
        match &sync {
            SyncOutcome::Updated { from, to } => {
                log.info(format!("update: sync: updated {from} -> {to}"))
            }
            SyncOutcome::UpToDate { head } => {
                log.info(format!("update: sync: already up to date at {head}"))
            }
        }

        log.info("update: verify: checking runtime environment");
        let environment = self.verifier.verify(self.config)?;
        log.info(format!(
            "update: verify: interpreter {} and launcher {} ok",
            environment.interpreter.display(),
            environment.launcher.display()
        ));

        log.info(format!(
            "update: install: applying {}",
            self.config.manifest.display()
        ));
        let install = self
            .installer
            .install_from_manifest(&environment, &self.config.manifest)
            .map_err(UpdateError::DependencyInstallFailed)?;
        match &install {
            InstallOutcome::AlreadySatisfied => {
                log.info("update: install: requirements already satisfied")
            }
            InstallOutcome::Installed { summary } => log.info(format!(
                "update: install: {}",
                summary.as_deref().unwrap_or("dependencies installed")
            )),
        }

        log.info("update: restart: signalling service");
        let mut channel = self.connector.connect(&environment, self.config);
        channel.restart().map_err(UpdateError::RestartFailed)?;
        log.info("update: restart: accepted");

        Ok(UpdateReport {
            sync,
            environment,
            install,
        })
    }
}
