//! Assemblies and interchangeable assembly sets

use crate::error::Result;
use crate::model::{AssemblyFile, AssemblyIdentity, Uid};
use crate::report::FailureKind;

use super::context::ResolutionContext;
use super::handle::{AddinHandle, AssemblyHandle, AssemblySetHandle};
use super::status::{Resolvable, ResolutionStatus, ResolveEnv};

/// One physical assembly shipped by an addin.
#[derive(Debug, Clone)]
pub struct AssemblyResolution {
    pub(crate) owner: AddinHandle,
    pub(crate) file: AssemblyFile,
    pub(crate) uid: Option<Uid>,
    pub(crate) set: AssemblySetHandle,
    pub(crate) status: ResolutionStatus,
}

impl AssemblyResolution {
    pub fn file(&self) -> &AssemblyFile {
        &self.file
    }

    pub fn uid(&self) -> Option<Uid> {
        self.uid
    }
}

/// Assemblies that share an identity. Any member satisfies a reference to
/// the identity.
#[derive(Debug, Clone)]
pub struct AssemblyResolutionSet {
    pub(crate) identity: AssemblyIdentity,
    pub(crate) members: Vec<AssemblyHandle>,
}

impl AssemblyResolutionSet {
    pub(crate) fn new(identity: AssemblyIdentity) -> Self {
        Self {
            identity,
            members: Vec::new(),
        }
    }

    pub fn identity(&self) -> &AssemblyIdentity {
        &self.identity
    }
}

impl Resolvable for AssemblyHandle {
    fn status(self, ctx: &ResolutionContext) -> ResolutionStatus {
        ctx.assembly(self).status
    }

    fn set_status(self, ctx: &mut ResolutionContext, status: ResolutionStatus) {
        ctx.assembly_mut(self).status = status;
    }

    /// Turn the assembly's external references into referenced sets of its
    /// addin. Fails when an identity has no provider at all.
    fn try_resolve(
        self,
        ctx: &mut ResolutionContext,
        env: &mut ResolveEnv<'_>,
    ) -> Result<ResolutionStatus> {
        let assembly = ctx.assembly(self);
        let owner = assembly.owner;
        let asset = format!("assembly '{}'", assembly.file.identity);

        let references = match env.introspector.external_references(&assembly.file) {
            Ok(references) => references,
            Err(err) => {
                return Ok(env.fail(ctx, owner, asset, FailureKind::Introspection, err.to_string()));
            }
        };

        match ctx.try_get_assembly_reference_sets(&references) {
            Ok(sets) => {
                for set in sets {
                    ctx.depend_on_set(owner, set);
                }
                Ok(ResolutionStatus::Success)
            }
            Err(missing) => Ok(env.fail(
                ctx,
                owner,
                asset,
                FailureKind::MissingReference,
                format!("no registered addin provides referenced assembly {missing}"),
            )),
        }
    }
}
