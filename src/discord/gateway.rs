use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{ActivityData, Context, EventHandler, Interaction, Ready};
use tracing::{debug, error, info};

use super::register::SubmissionPlan;
use super::BotContext;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::Data;

/// Gateway event handler: submits the schema on ready and routes every
/// interaction through the dispatcher.
pub struct Handler {
    dispatcher: Dispatcher<BotContext>,
    data: Arc<Data>,
    plan: Option<SubmissionPlan>,
}

impl Handler {
    /// `plan` is submitted on every ready event when present.
    pub fn new(
        dispatcher: Dispatcher<BotContext>,
        data: Arc<Data>,
        plan: Option<SubmissionPlan>,
    ) -> Self {
        Self {
            dispatcher,
            data,
            plan,
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
        ctx.set_activity(Some(ActivityData::custom(&self.data.config.status_message)));

        if let Some(plan) = &self.plan {
            if let Err(e) = plan.submit(&ctx.http).await {
                error!("Failed to register commands: {:?}", e);
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let bot_ctx = BotContext::new(ctx, interaction, Arc::clone(&self.data));
        match self.dispatcher.dispatch(&bot_ctx).await {
            Ok(DispatchOutcome::Dropped) => {
                debug!("Dropped interaction {:?}", bot_ctx.interaction.id());
            }
            Ok(outcome) => debug!("Interaction finished: {:?}", outcome),
            Err(e) => error!("Error while handling interaction: {:?}", e),
        }
    }
}
