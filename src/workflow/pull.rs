use dump_artifact::DumpArtifact;

use super::{run_step, Step, SyncReport, Workflow};
use crate::executor::Direction;
use crate::Error;

impl Workflow<'_> {
    /// Replace the local database with a fresh dump of the remote one.
    ///
    /// Always dumps, even when an artifact with the same name is already on
    /// either host.
    pub async fn pull(&self) -> Result<SyncReport, Error> {
        let direction = Direction::RemoteToLocal;
        tracing::info!("Pulling database ({})", direction);

        run_step(Step::EnsureDirectories, self.ensure_directories()).await?;
        let (artifact, dumped) = run_step(Step::Dump, self.dump_remote()).await?;
        self.deliver(direction, artifact, dumped).await
    }

    async fn dump_remote(&self) -> Result<(DumpArtifact, bool), Error> {
        let artifact = self.artifact(Direction::RemoteToLocal).await?;
        tracing::info!("Dumping remote database into {}", artifact.remote_path.display());
        let dumped = self.dump(&artifact).await?;
        Ok((artifact, dumped))
    }
}
