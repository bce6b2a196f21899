use dump_artifact::DumpArtifact;

use super::{run_step, Step, SyncReport, Workflow};
use crate::executor::Direction;
use crate::Error;

impl Workflow<'_> {
    /// Replace the remote database with the local one.
    ///
    /// A dump already present at the resolved local path is shipped as-is
    /// instead of dumping again.
    pub async fn push(&self) -> Result<SyncReport, Error> {
        let direction = Direction::LocalToRemote;
        tracing::info!("Pushing database ({})", direction);

        run_step(Step::EnsureDirectories, self.ensure_directories()).await?;
        let (artifact, dumped) = run_step(Step::Dump, self.dump_local()).await?;
        self.deliver(direction, artifact, dumped).await
    }

    async fn dump_local(&self) -> Result<(DumpArtifact, bool), Error> {
        let artifact = self.artifact(Direction::LocalToRemote).await?;
        if self.resolver.exists_locally(&artifact).await? {
            tracing::warn!(
                "Reusing existing dump {}, skipping mysqldump",
                artifact.local_path.display()
            );
            return Ok((artifact, false));
        }

        tracing::info!("Dumping local database into {}", artifact.local_path.display());
        let dumped = self.dump(&artifact).await?;
        Ok((artifact, dumped))
    }
}
