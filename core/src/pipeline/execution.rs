// core/src/pipeline/execution.rs

use super::context_data::ContextData;
use super::control::{PipelineControl, PipelineResult};
use super::definition::{Handler, Phase, Pipeline};
use crate::error::FlowError;
use tracing::{event, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// A step whose `skip_if` holds is skipped. A non-optional step without any
  /// handler fails with `FlowError::HandlerMissing`; an optional one is passed
  /// over. The first `Stop` ends the run with `PipelineResult::Stopped`, the
  /// first error is returned as-is.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(flow = self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Flow starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        let skip = ctx_data.snapshot(|data| skip_if(data));
        if skip {
          event!(Level::DEBUG, step = step_name, "Step skipped by condition.");
          continue;
        }
      }

      let has_handlers = [&self.before, &self.on, &self.after]
        .iter()
        .any(|table| table.get(step_name).is_some_and(|v| !v.is_empty()));

      if !has_handlers {
        if step_def.optional {
          event!(Level::DEBUG, step = step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step = step_name, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = tracing::info_span!("flow_step", step = step_name, step_index = step_idx);
      let control = self
        .run_step_phases(step_name, ctx_data.clone())
        .instrument(step_span)
        .await?;

      if control == PipelineControl::Stop {
        event!(Level::INFO, step = step_name, "Flow stopped by handler.");
        return Ok(PipelineResult::Stopped);
      }
    }

    event!(Level::DEBUG, "Flow completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step_phases(&self, step_name: &str, ctx_data: ContextData<TData>) -> Result<PipelineControl, Err> {
    for phase in [Phase::Before, Phase::On, Phase::After] {
      let table = match phase {
        Phase::Before => &self.before,
        Phase::On => &self.on,
        Phase::After => &self.after,
      };
      if let Some(handlers) = table.get(step_name) {
        if run_handlers(handlers, &ctx_data).await? == PipelineControl::Stop {
          return Ok(PipelineControl::Stop);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }
}

async fn run_handlers<TData, Err>(
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> Result<PipelineControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler_fn in handlers {
    match handler_fn(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
      Err(e) => {
        event!(Level::WARN, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(PipelineControl::Continue)
}
