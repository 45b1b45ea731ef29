use async_trait::async_trait;
use chronicle_common::{ContextPatch, GenerationContext, Stage};

use super::{require, Phase, PhaseEnv};
use crate::error::PipelineResult;
use crate::prompts;

pub struct ResearchPhase;

#[async_trait]
impl Phase for ResearchPhase {
    fn stage(&self) -> Stage {
        Stage::Research
    }

    fn check(&self, _ctx: &GenerationContext) -> PipelineResult<()> {
        Ok(())
    }

    async fn run(
        &self,
        ctx: &GenerationContext,
        env: &mut PhaseEnv<'_>,
    ) -> PipelineResult<ContextPatch> {
        let value = env.call(prompts::research(&ctx.seed)).await?;
        let mut normalizer = env.normalizer(&ctx.seed);
        let research = normalizer.research(&value);
        env.record_drops(normalizer);
        Ok(ContextPatch::Research(research))
    }
}

pub struct SkeletonPhase;

#[async_trait]
impl Phase for SkeletonPhase {
    fn stage(&self) -> Stage {
        Stage::Skeleton
    }

    fn check(&self, ctx: &GenerationContext) -> PipelineResult<()> {
        require(&ctx.research, Stage::Skeleton, "research").map(|_| ())
    }

    async fn run(
        &self,
        ctx: &GenerationContext,
        env: &mut PhaseEnv<'_>,
    ) -> PipelineResult<ContextPatch> {
        let research = require(&ctx.research, Stage::Skeleton, "research")?;
        let value = env.call(prompts::skeleton(&ctx.seed, research)).await?;
        let mut normalizer = env.normalizer(&ctx.seed);
        let skeleton = normalizer.skeleton(&value);
        env.record_drops(normalizer);
        Ok(ContextPatch::Skeleton(skeleton))
    }
}

pub struct NarrativePhase;

#[async_trait]
impl Phase for NarrativePhase {
    fn stage(&self) -> Stage {
        Stage::Narrative
    }

    fn check(&self, ctx: &GenerationContext) -> PipelineResult<()> {
        require(&ctx.skeleton, Stage::Narrative, "skeleton").map(|_| ())
    }

    async fn run(
        &self,
        ctx: &GenerationContext,
        env: &mut PhaseEnv<'_>,
    ) -> PipelineResult<ContextPatch> {
        let skeleton = require(&ctx.skeleton, Stage::Narrative, "skeleton")?;
        let value = env.call(prompts::narrative(&ctx.seed, skeleton)).await?;
        let mut normalizer = env.normalizer(&ctx.seed);
        let narrative = normalizer.narrative(&value);
        env.record_drops(normalizer);
        Ok(ContextPatch::Narrative(narrative))
    }
}

pub struct EnrichmentPhase;

#[async_trait]
impl Phase for EnrichmentPhase {
    fn stage(&self) -> Stage {
        Stage::Enrichment
    }

    fn check(&self, ctx: &GenerationContext) -> PipelineResult<()> {
        require(&ctx.narrative, Stage::Enrichment, "narrative")?;
        require(&ctx.events, Stage::Enrichment, "expanded events")?;
        Ok(())
    }

    async fn run(
        &self,
        ctx: &GenerationContext,
        env: &mut PhaseEnv<'_>,
    ) -> PipelineResult<ContextPatch> {
        let narrative = require(&ctx.narrative, Stage::Enrichment, "narrative")?;
        let events = require(&ctx.events, Stage::Enrichment, "expanded events")?;
        let value = env
            .call(prompts::enrichment(&ctx.seed, narrative, events))
            .await?;
        let mut normalizer = env.normalizer(&ctx.seed);
        let enrichment = normalizer.enrichment(&value);
        env.record_drops(normalizer);
        Ok(ContextPatch::Enrichment(enrichment))
    }
}

pub struct SeoPhase;

#[async_trait]
impl Phase for SeoPhase {
    fn stage(&self) -> Stage {
        Stage::Seo
    }

    fn check(&self, ctx: &GenerationContext) -> PipelineResult<()> {
        require(&ctx.narrative, Stage::Seo, "narrative").map(|_| ())
    }

    async fn run(
        &self,
        ctx: &GenerationContext,
        env: &mut PhaseEnv<'_>,
    ) -> PipelineResult<ContextPatch> {
        let narrative = require(&ctx.narrative, Stage::Seo, "narrative")?;
        let value = env.call(prompts::seo(&ctx.seed, narrative)).await?;
        let fallback_title = if narrative.page_title.is_empty() {
            ctx.seed.title.as_str()
        } else {
            narrative.page_title.as_str()
        };
        let mut normalizer = env.normalizer(&ctx.seed);
        let seo = normalizer.seo(&value, fallback_title);
        env.record_drops(normalizer);
        Ok(ContextPatch::Seo(seo))
    }
}
