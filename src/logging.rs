use log::Level::Trace;
use log::{log_enabled, trace};

use crate::cursor::Cursor;
use crate::{util, LOG_TARGET};
use std::fmt::Debug;

pub(crate) trait Loggable {
    const LABEL_WIDTH: usize = 15;
    const INPUT_WIDTH: usize = 33;
    fn log_inputs<Args: Debug>(&self, msg: &str, args: Args);
    fn log_success<Args: Debug>(&self, msg: &str, args: Args);
    fn log_failure<Args: Debug, Error: Debug>(&self, msg: &str, args: Args, error: &Error);
}

impl<'b> Loggable for Cursor<'b> {
    fn log_inputs<Args: Debug>(&self, msg: &str, args: Args) {
        if log_enabled!(target: LOG_TARGET, Trace) {
            trace!(
                target: LOG_TARGET,
                "{inp} {pos:<lw$} : {operation}",
                lw = Self::LABEL_WIDTH,
                pos = self.pos().to_string(),
                inp = util::preview(self.rest(), Self::INPUT_WIDTH),
                operation = format!("{msg}({args:?})"),
            );
        }
    }

    fn log_success<Args: Debug>(&self, msg: &str, args: Args) {
        if log_enabled!(target: LOG_TARGET, Trace) {
            trace!(
                target: LOG_TARGET,
                "{inp} {pos:<lw$} : {operation} -> ok",
                lw = Self::LABEL_WIDTH,
                pos = self.pos().to_string(),
                inp = util::preview(self.rest(), Self::INPUT_WIDTH),
                operation = format!("{msg}({args:?})"),
            );
        }
    }

    fn log_failure<Args: Debug, Error: Debug>(&self, msg: &str, args: Args, error: &Error) {
        if log_enabled!(target: LOG_TARGET, Trace) {
            trace!(
                target: LOG_TARGET,
                "{inp} {pos:<lw$} : {operation} -> {e:?}",
                lw = Self::LABEL_WIDTH,
                pos = self.pos().to_string(),
                inp = util::preview(self.rest(), Self::INPUT_WIDTH),
                operation = format!("{msg}({args:?})"),
                e = error,
            );
        }
    }
}
