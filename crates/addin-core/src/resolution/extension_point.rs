//! Extension points

use crate::error::Result;
use crate::model::{CapabilityKind, TypeMetadata, Uid};
use crate::report::FailureKind;

use super::context::{ResolutionContext, ResolvedType};
use super::handle::{AddinHandle, PointHandle};
use super::status::{Resolvable, ResolutionStatus, ResolveEnv};

#[derive(Debug, Clone)]
pub struct ExtensionPointResolution {
    pub(crate) owner: AddinHandle,
    pub(crate) id: String,
    pub(crate) type_name: String,
    pub(crate) description: Option<String>,
    pub(crate) uid: Option<Uid>,
    pub(crate) status: ResolutionStatus,
    pub(crate) signature: Option<ResolvedType>,
}

impl ExtensionPointResolution {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn signature(&self) -> Option<&ResolvedType> {
        self.signature.as_ref()
    }

    pub(crate) fn asset_label(&self) -> String {
        format!("extension point '{}'", self.id)
    }
}

/// Rules every extension point and declared builder type must satisfy
/// regardless of role.
pub(crate) fn check_instantiable(metadata: &TypeMetadata) -> std::result::Result<(), String> {
    if !metadata.is_concrete_class() {
        return Err(format!("type '{}' is not a concrete class", metadata.name));
    }
    if !metadata.has_public_parameterless_ctor {
        return Err(format!(
            "type '{}' has no public parameterless constructor",
            metadata.name
        ));
    }
    Ok(())
}

impl Resolvable for PointHandle {
    fn status(self, ctx: &ResolutionContext) -> ResolutionStatus {
        ctx.point(self).status
    }

    fn set_status(self, ctx: &mut ResolutionContext, status: ResolutionStatus) {
        ctx.point_mut(self).status = status;
    }

    fn try_resolve(
        self,
        ctx: &mut ResolutionContext,
        env: &mut ResolveEnv<'_>,
    ) -> Result<ResolutionStatus> {
        let point = ctx.point(self);
        let owner = point.owner;
        let asset = point.asset_label();
        let type_name = point.type_name.clone();

        let Some(lookup) = ctx.get_unique_addin_type(owner, &type_name, env.introspector)? else {
            let message = format!("type '{type_name}' not found");
            return Ok(env.fail(ctx, owner, asset, FailureKind::MissingType, message));
        };
        match ctx.depend_on_type(owner, &lookup) {
            ResolutionStatus::Success => {}
            ResolutionStatus::Pending => return Ok(ResolutionStatus::Pending),
            ResolutionStatus::Failed => {
                let message = format!("addin providing type '{type_name}' failed");
                return Ok(env.fail(ctx, owner, asset, FailureKind::DependencyFailed, message));
            }
        }

        if let Err(message) = check_instantiable(&lookup.metadata) {
            return Ok(env.fail(ctx, owner, asset, FailureKind::RuleViolation, message));
        }
        let Some(extension_type) = lookup
            .metadata
            .extension_type_for(CapabilityKind::ExtensionPoint)
        else {
            let message = format!("type '{type_name}' is not an extension point");
            return Ok(env.fail(ctx, owner, asset, FailureKind::RuleViolation, message));
        };

        let signature = ResolvedType::from_lookup(&lookup, extension_type, true);
        ctx.point_mut(self).signature = Some(signature);
        Ok(ResolutionStatus::Success)
    }
}
