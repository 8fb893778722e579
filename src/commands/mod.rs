//! Command authorization gateway.
//!
//! Command handlers themselves live with the network collaborators;
//! this module answers the one question they all share: may this
//! caller run a command of this level from this channel. Denials carry
//! a reason naming the missing permission or the allowed channels.

use std::sync::Arc;

use tracing::debug;

use crate::links::registry::LinkRegistry;

/// Token the echo test command embeds in relayed text so the game side
/// can recognize the message and bounce it back.
pub const ECHO_COMMAND_TOKEN: &str = "COURIER_ECHO";

/// Permission level a command demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionLevel {
    User,
    Admin,
}

/// Who is invoking a command, and from where.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub caller_name: String,
    /// Role names held by the caller on the platform.
    pub caller_roles: Vec<String>,
    pub channel_id: u64,
    pub channel_name: String,
    /// Direct messages bypass the channel restriction.
    pub is_direct_message: bool,
}

/// Authorization verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAccess {
    Allowed,
    Denied { reason: String },
}

impl CommandAccess {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Checks command invocations against admin roles and the configured
/// command channels.
pub struct CommandGateway {
    registry: Arc<LinkRegistry>,
    admin_roles: Vec<String>,
}

impl CommandGateway {
    pub fn new(registry: Arc<LinkRegistry>, admin_roles: Vec<String>) -> Self {
        Self {
            registry,
            admin_roles,
        }
    }

    /// Decide whether `ctx` may run a command requiring `level`.
    pub fn check(&self, ctx: &CommandContext, level: PermissionLevel) -> CommandAccess {
        let is_admin = self.is_admin(ctx);

        if level == PermissionLevel::Admin && !is_admin {
            debug!("Denied admin command for '{}'", ctx.caller_name);
            return CommandAccess::Denied {
                reason: format!(
                    "This command requires one of the admin roles: {}",
                    self.admin_roles.join(", ")
                ),
            };
        }

        // Admins and direct messages are exempt from the channel list.
        if is_admin || ctx.is_direct_message {
            return CommandAccess::Allowed;
        }

        let table = self.registry.snapshot();
        let allowed = table.command_channels();
        // An empty or fully unresolved list means no restriction.
        if allowed.is_empty() {
            return CommandAccess::Allowed;
        }

        let permitted = allowed.iter().any(|link| {
            link.platform_channel
                .refers_to(ctx.channel_id, &ctx.channel_name)
        });
        if permitted {
            return CommandAccess::Allowed;
        }

        let names: Vec<&str> = allowed
            .iter()
            .map(|link| link.platform_channel.target.as_str())
            .collect();
        CommandAccess::Denied {
            reason: format!("Commands are only allowed in: {}", names.join(", ")),
        }
    }

    fn is_admin(&self, ctx: &CommandContext) -> bool {
        ctx.caller_roles.iter().any(|role| {
            self.admin_roles
                .iter()
                .any(|admin| admin.eq_ignore_ascii_case(role))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ConfigData;
    use crate::links::types::{FeedLink, ResolvedChannel};

    fn gateway_with_command_channel() -> CommandGateway {
        let mut link = FeedLink::new("bot-commands");
        link.platform_channel.initialize(ResolvedChannel {
            guild_id: 1,
            channel_id: 500,
            name: "bot-commands".to_string(),
        });
        let config = ConfigData {
            command_channels: vec![link],
            ..Default::default()
        };
        let registry = Arc::new(LinkRegistry::new());
        registry.rebuild(&config);
        CommandGateway::new(registry, vec!["Moderator".to_string()])
    }

    fn gateway_without_channels() -> CommandGateway {
        let registry = Arc::new(LinkRegistry::new());
        registry.rebuild(&ConfigData::default());
        CommandGateway::new(registry, vec!["Moderator".to_string()])
    }

    fn user_in_channel(channel_id: u64, channel_name: &str) -> CommandContext {
        CommandContext {
            caller_name: "Ann".to_string(),
            caller_roles: Vec::new(),
            channel_id,
            channel_name: channel_name.to_string(),
            is_direct_message: false,
        }
    }

    #[test]
    fn empty_command_channel_list_allows_everywhere() {
        let gateway = gateway_without_channels();
        let verdict = gateway.check(&user_in_channel(999, "anywhere"), PermissionLevel::User);
        assert!(verdict.is_allowed());
    }

    #[test]
    fn wrong_channel_is_denied_with_allowed_list() {
        let gateway = gateway_with_command_channel();
        let verdict = gateway.check(&user_in_channel(999, "general"), PermissionLevel::User);
        match verdict {
            CommandAccess::Denied { reason } => assert!(reason.contains("bot-commands")),
            CommandAccess::Allowed => panic!("expected denial"),
        }
    }

    #[test]
    fn listed_channel_is_allowed() {
        let gateway = gateway_with_command_channel();
        let verdict = gateway.check(&user_in_channel(500, "bot-commands"), PermissionLevel::User);
        assert!(verdict.is_allowed());
    }

    #[test]
    fn direct_messages_bypass_channel_restriction() {
        let gateway = gateway_with_command_channel();
        let mut ctx = user_in_channel(0, "");
        ctx.is_direct_message = true;
        assert!(gateway.check(&ctx, PermissionLevel::User).is_allowed());
    }

    #[test]
    fn admin_role_bypasses_channel_restriction() {
        let gateway = gateway_with_command_channel();
        let mut ctx = user_in_channel(999, "general");
        ctx.caller_roles = vec!["moderator".to_string()];
        assert!(gateway.check(&ctx, PermissionLevel::Admin).is_allowed());
    }

    #[test]
    fn missing_admin_role_is_denied_with_role_names() {
        let gateway = gateway_with_command_channel();
        let verdict = gateway.check(&user_in_channel(500, "bot-commands"), PermissionLevel::Admin);
        match verdict {
            CommandAccess::Denied { reason } => assert!(reason.contains("Moderator")),
            CommandAccess::Allowed => panic!("expected denial"),
        }
    }
}
